use clap::Parser;

use sitemap_cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    match sitemap_cli::run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("catalog-sitemap failed: {err:#}");
            std::process::exit(1);
        }
    }
}
