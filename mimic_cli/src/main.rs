use clap::Parser;
use mimic::{CloneConfig, ClonePipeline};
use std::path::PathBuf;

/// Clone the visual appearance of a webpage into a standalone HTML
/// preview rewritten for a new topic.
#[derive(Debug, Parser)]
#[command(name = "mimic", version, about)]
struct Cli {
    /// The URL to clone.
    #[arg(short, long)]
    url: String,

    /// Topic the cloned page should be rewritten for.
    #[arg(short, long)]
    topic: String,

    /// Directory for the final HTML document.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    if cli.verbose {
        use env_logger::Env;
        let env = Env::default()
            .filter_or("RUST_LOG", "debug")
            .write_style_or("RUST_LOG_STYLE", "always");
        env_logger::init_from_env(env);
    }

    let url = if cli.url.starts_with("http") {
        cli.url
    } else {
        format!("https://{}", cli.url)
    };

    let config = match CloneConfig::from_env() {
        Ok(config) => match cli.output {
            Some(output) => config.with_output_root(output),
            None => config,
        },
        Err(e) => {
            eprintln!("configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let pipeline = match ClonePipeline::builder().with_config(config).build() {
        Ok(pipeline) => pipeline,
        Err(e) => {
            eprintln!("failed to build pipeline: {}", e);
            std::process::exit(1);
        }
    };

    match pipeline.clone_page(&url, &cli.topic).await {
        Ok(page) => println!("{}", page.path.display()),
        Err(e) => {
            eprintln!("clone failed: {}", e);
            std::process::exit(1);
        }
    }
}
