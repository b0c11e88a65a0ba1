use anyhow::{bail, Context, Result};
use filmscraper::{
    fetch::{DocumentSource, HttpSource, StaticSource},
    logging, pipeline, Config,
};
use std::{env, fs, process::exit};

/// Run the pipeline once and print the answer array.
///
/// Usage: analyze_once [--file <HTML_FILE>]
#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if let Err(e) = run(&args).await {
        eprintln!("Error: {:#}", e);
        exit(1);
    }
}

async fn run(args: &[String]) -> Result<()> {
    let cfg = Config::from_env()?;
    logging::init(&cfg.log_level);

    let source: Box<dyn DocumentSource> = match args.get(1..).unwrap_or_default() {
        [] => Box::new(HttpSource::from_config(&cfg)?),
        [flag, path] if flag == "--file" => {
            let html = fs::read_to_string(path).with_context(|| format!("reading {}", path))?;
            Box::new(StaticSource::new(path.clone(), html))
        }
        _ => bail!("Usage: {} [--file <HTML_FILE>]", args.first().map(String::as_str).unwrap_or("analyze_once")),
    };

    let answers = pipeline::run(source.as_ref()).await?;
    println!("{}", serde_json::to_string_pretty(&answers)?);
    Ok(())
}
