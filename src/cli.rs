mod browse;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;

use crate::{
  api::{PageLoader, query::DEFAULT_PAGE_SIZE},
  config::AppConfig,
  server::ServerConfig,
  view::{SortOrder, ViewState},
};

#[derive(Parser)]
pub struct Cli {
  #[clap(subcommand)]
  subcmd: SubCommand,

  /// YAML config file; built-in defaults are used when omitted
  #[clap(long, short, env = "IDEAS_PORTAL_CONFIG")]
  config: Option<PathBuf>,
}

#[derive(Parser)]
enum SubCommand {
  /// Serve the listing page, the JSON API and the image relay
  Server(ServerConfig),
  /// Fetch one page and print it as JSON
  Fetch(PageArgs),
  /// Page through the listing interactively
  Browse(PageArgs),
}

#[derive(Parser, Debug)]
struct PageArgs {
  #[clap(long, short, default_value_t = 1)]
  page: u32,
  #[clap(long, short('n'), default_value_t = DEFAULT_PAGE_SIZE)]
  per_page: u32,
  #[clap(
    long,
    short,
    default_value = "newest",
    value_parser = parse_sort_order
  )]
  sort: SortOrder,
}

impl PageArgs {
  fn view_state(&self) -> ViewState {
    ViewState::default()
      .with_sort(self.sort)
      .with_per_page(self.per_page)
      .with_page(self.page)
  }
}

fn parse_sort_order(s: &str) -> Result<SortOrder, String> {
  SortOrder::parse(s)
    .ok_or_else(|| format!("unknown sort order {s:?}, use newest or oldest"))
}

impl Cli {
  pub async fn run(self) -> anyhow::Result<()> {
    let config = AppConfig::load(self.config.as_deref())
      .context("failed to load config")?;

    match self.subcmd {
      SubCommand::Server(server_config) => {
        server_config.run(&config).await?;
      }
      SubCommand::Fetch(args) => {
        let api = config.build_api()?;
        let query = args.view_state().list_query();
        let page = api
          .load(&query)
          .await
          .with_context(|| format!("failed to load page {}", query.page()))?;
        println!("{}", serde_json::to_string_pretty(&page)?);
      }
      SubCommand::Browse(args) => {
        let api: Arc<dyn PageLoader> = Arc::new(config.build_api()?);
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        browse::browse(api, args.view_state(), stdin, &mut std::io::stdout())
          .await?;
      }
    }

    Ok(())
  }
}
