use std::{io::Write, sync::Arc};

use tokio::{
  io::{AsyncBufRead, AsyncBufReadExt},
  sync::mpsc,
};
use tracing::debug;

use crate::{
  api::{FetchError, PageLoader, PageResult},
  error::ErrorReport,
  view::{PageController, SortOrder, Ticket, ViewState},
};

const HELP: &str = "commands: n (next), p (previous), <number> (go to page), \
                    size <n>, sort newest|oldest, r (reload), q (quit)";

type Settled = (Ticket, Result<PageResult, FetchError>);

#[derive(Debug, PartialEq, Eq)]
enum Command {
  Next,
  Prev,
  Goto(u32),
  Size(u32),
  Sort(SortOrder),
  Reload,
  Help,
  Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
  let mut words = line.split_whitespace();
  let command = match (words.next(), words.next()) {
    (Some("n" | "next"), None) => Command::Next,
    (Some("p" | "prev"), None) => Command::Prev,
    (Some("r" | "reload"), None) => Command::Reload,
    (Some("q" | "quit"), None) => Command::Quit,
    (Some("h" | "help" | "?"), None) => Command::Help,
    (Some("size"), Some(n)) => match n.parse::<u32>() {
      Ok(n) if n >= 1 => Command::Size(n),
      _ => return Err(format!("invalid page size: {n}")),
    },
    (Some("sort"), Some(order)) => match SortOrder::parse(order) {
      Some(order) => Command::Sort(order),
      None => return Err(format!("invalid sort order: {order}")),
    },
    (Some(page), None) => match page.parse::<u32>() {
      Ok(page) if page >= 1 => Command::Goto(page),
      _ => return Err(format!("unknown command: {}", line.trim())),
    },
    _ => return Err(format!("unknown command: {}", line.trim())),
  };

  if words.next().is_some() {
    return Err(format!("unknown command: {}", line.trim()));
  }
  Ok(command)
}

/// The state a command leads to. `total_pages` is only known once a page
/// has loaded; until then "next" is not clamped.
fn apply(
  state: ViewState,
  command: &Command,
  total_pages: Option<u32>,
) -> ViewState {
  let last = total_pages.unwrap_or(u32::MAX).max(1);
  match *command {
    Command::Next => state.with_page(state.page.saturating_add(1).min(last)),
    Command::Prev => state.with_page(state.page.saturating_sub(1)),
    Command::Goto(page) => state.with_page(page.min(last)),
    Command::Size(size) => state.with_per_page(size),
    Command::Sort(sort) => state.with_sort(sort),
    Command::Reload | Command::Help | Command::Quit => state,
  }
}

struct Browser<W> {
  loader: Arc<dyn PageLoader>,
  controller: PageController,
  waiting: bool,
  total_pages: Option<u32>,
  tx: mpsc::UnboundedSender<Settled>,
  out: W,
}

impl<W: Write> Browser<W> {
  fn load(&mut self, next: ViewState) {
    let ticket = self.controller.navigate(next);
    self.waiting = true;

    let loader = self.loader.clone();
    let tx = self.tx.clone();
    let query = next.list_query();
    tokio::spawn(async move {
      let result = loader.load(&query).await;
      // the receiver is gone once the user quit
      let _ = tx.send((ticket, result));
    });
  }

  fn settle(&mut self, (ticket, result): Settled) -> std::io::Result<()> {
    let Some(result) = self.controller.settle(ticket, result) else {
      debug!("discarding stale page load {ticket:?}");
      return Ok(());
    };
    self.waiting = false;

    match result {
      Ok(page) => {
        self.total_pages = Some(page.total_pages);
        print_page(&mut self.out, &self.controller.state(), &page)
      }
      Err(e) => {
        let report = ErrorReport::from(&e);
        writeln!(self.out, "{}: {}", report.title(), report.message)?;
        writeln!(self.out, "type r to try again")
      }
    }
  }

  fn handle_line(&mut self, line: &str) -> std::io::Result<bool> {
    if line.trim().is_empty() {
      return Ok(true);
    }

    let command = match parse_command(line) {
      Ok(command) => command,
      Err(msg) => {
        writeln!(self.out, "{msg}")?;
        writeln!(self.out, "{HELP}")?;
        return Ok(true);
      }
    };

    match command {
      Command::Quit => return Ok(false),
      Command::Help => writeln!(self.out, "{HELP}")?,
      Command::Reload => self.load(self.controller.state()),
      command => {
        let current = self.controller.state();
        let next = apply(current, &command, self.total_pages);
        if next == current {
          writeln!(self.out, "already on page {}", current.page)?;
        } else {
          self.load(next);
        }
      }
    }
    Ok(true)
  }
}

fn print_page(
  out: &mut impl Write,
  state: &ViewState,
  page: &PageResult,
) -> std::io::Result<()> {
  writeln!(
    out,
    "page {}/{} ({}, {} per page)",
    page.current_page,
    page.total_pages.max(1),
    state.sort.as_str(),
    state.per_page
  )?;
  match page.item_range() {
    Some((start, end)) => {
      writeln!(out, "showing {start} - {end} of {}", page.total_items)?
    }
    None => writeln!(out, "no ideas found")?,
  }

  for post in &page.items {
    let date = post
      .published_at
      .map(|date| date.format("%Y-%m-%d").to_string())
      .unwrap_or_else(|| "invalid date".to_owned());
    writeln!(out, "  {date}  {}", post.title)?;
  }
  Ok(())
}

/// Runs the interactive pager until `q` or the end of input.
///
/// Loads run in the background while input keeps being read; only the
/// result of the most recent navigation is printed.
pub async fn browse<R, W>(
  loader: Arc<dyn PageLoader>,
  initial: ViewState,
  input: R,
  out: W,
) -> std::io::Result<()>
where
  R: AsyncBufRead + Unpin,
  W: Write,
{
  let (tx, mut rx) = mpsc::unbounded_channel();
  let mut browser = Browser {
    loader,
    controller: PageController::new(initial),
    waiting: false,
    total_pages: None,
    tx,
    out,
  };
  writeln!(browser.out, "{HELP}")?;
  browser.load(initial);

  let mut lines = input.lines();
  let mut input_open = true;

  while input_open || browser.waiting {
    tokio::select! {
      line = lines.next_line(), if input_open => match line? {
        Some(line) => {
          if !browser.handle_line(&line)? {
            break;
          }
        }
        None => input_open = false,
      },
      Some(settled) = rx.recv() => browser.settle(settled)?,
    }
  }

  browser.out.flush()
}

#[cfg(test)]
mod test {
  use std::time::Duration;

  use super::*;
  use crate::api::{DisplayPost, ListQuery};

  /// Answers page N after `delays[N - 1]`, so earlier pages can be made
  /// to settle after later ones.
  struct SlowLoader {
    delays: Vec<Duration>,
  }

  #[async_trait::async_trait]
  impl PageLoader for SlowLoader {
    async fn load(&self, query: &ListQuery) -> Result<PageResult, FetchError> {
      let page = query.page();
      let delay = self.delays.get(page as usize - 1).copied();
      let Some(delay) = delay else {
        return Err(FetchError::Connectivity);
      };
      tokio::time::sleep(delay).await;

      let items = (0..2)
        .map(|i| DisplayPost {
          id: i64::from(page) * 10 + i,
          slug: format!("p{page}-{i}"),
          title: format!("Page {page} item {i}"),
          content: String::new(),
          published_at: None,
          image: String::new(),
          medium_image: String::new(),
        })
        .collect();
      Ok(PageResult {
        items,
        current_page: page,
        total_pages: self.delays.len() as u32,
        total_items: self.delays.len() as u64 * 2,
        per_page: 2,
      })
    }
  }

  async fn run(delays: &[u64], input: &str) -> String {
    let loader = Arc::new(SlowLoader {
      delays: delays.iter().map(|&ms| Duration::from_millis(ms)).collect(),
    });
    let mut out = Vec::new();
    browse(loader, ViewState::default(), input.as_bytes(), &mut out)
      .await
      .unwrap();
    String::from_utf8(out).unwrap()
  }

  #[test]
  fn test_parse_command() {
    assert_eq!(parse_command("n"), Ok(Command::Next));
    assert_eq!(parse_command(" prev "), Ok(Command::Prev));
    assert_eq!(parse_command("7"), Ok(Command::Goto(7)));
    assert_eq!(parse_command("size 20"), Ok(Command::Size(20)));
    assert_eq!(
      parse_command("sort oldest"),
      Ok(Command::Sort(SortOrder::Oldest))
    );
    assert_eq!(parse_command("q"), Ok(Command::Quit));
    assert!(parse_command("0").is_err());
    assert!(parse_command("size 0").is_err());
    assert!(parse_command("sort sideways").is_err());
    assert!(parse_command("n n").is_err());
    assert!(parse_command("jump").is_err());
  }

  #[test]
  fn test_apply() {
    let state = ViewState::default().with_page(3);
    assert_eq!(apply(state, &Command::Next, Some(3)).page, 3);
    assert_eq!(apply(state, &Command::Next, None).page, 4);
    assert_eq!(apply(state, &Command::Prev, None).page, 2);
    assert_eq!(apply(state, &Command::Goto(9), Some(5)).page, 5);
    assert_eq!(apply(state, &Command::Size(50), None).page, 1);
    assert_eq!(
      apply(state, &Command::Sort(SortOrder::Oldest), None).page,
      1
    );
    assert_eq!(apply(ViewState::default(), &Command::Prev, None).page, 1);
  }

  #[tokio::test]
  async fn test_stale_load_is_discarded() {
    // page 1 takes much longer than page 2, which was asked for later
    let out = run(&[300, 10, 10], "n\n").await;
    assert!(out.contains("Page 2 item 0"), "{out}");
    assert!(!out.contains("Page 1 item 0"), "{out}");
  }

  #[tokio::test]
  async fn test_pages_through_listing() {
    let out = run(&[10, 10, 10], "").await;
    assert!(out.contains("page 1/3 (newest, 10 per page)"), "{out}");
    assert!(out.contains("showing 1 - 2 of 6"), "{out}");
    assert!(out.contains("invalid date"));
  }

  #[tokio::test]
  async fn test_errors_are_reported() {
    let out = run(&[], "").await;
    assert!(out.contains("Unable to connect to the API."), "{out}");
    assert!(out.contains("type r to try again"));
  }

  #[tokio::test]
  async fn test_quit_stops_immediately() {
    let out = run(&[5_000], "q\n").await;
    assert!(!out.contains("Page 1 item 0"));
  }
}
