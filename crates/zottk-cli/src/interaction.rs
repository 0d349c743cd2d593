//! Terminal output and prompts.
//!
//! Commands talk to the user only through [`UserInteraction`], so that `--accept-defaults`
//! can answer every question without a terminal.

use dialoguer::{Confirm, Select};

use super::*;

/// Prefix for information messages
pub static INFO_PREFIX: &str = "ℹ ";
/// Prefix for success messages
pub static SUCCESS_PREFIX: &str = "✓ ";
/// Prefix for error messages
pub static ERROR_PREFIX: &str = "✗ ";
/// Prefix for warning messages
pub static WARNING_PREFIX: &str = "! ";
/// Prefix for user prompts
pub static PROMPT_PREFIX: &str = "❯ ";
/// Prefix of an item in a list
pub static ITEM_PREFIX: &str = "├─";
/// Prefix of the last item in a list
pub static LAST_ITEM_PREFIX: &str = "└─";
/// Separates a key from what it maps to
pub static ARROW: &str = "→";

/// Something to show the user.
#[derive(Debug)]
pub enum ResponseContent<'a> {
  /// Outcome of a collection export
  Summary(&'a RunSummary),
  /// Call numbers about to be written
  Plan(&'a [CallNumberUpdate]),
  /// Outcome of writing call numbers
  Report(&'a UpdateReport),
  /// An operation completed
  Success(&'a str),
  /// Something worth noting that is not a problem
  Info(&'a str),
  /// A problem that did not stop the command
  Warning(&'a str),
}

/// The ways a command interacts with the user.
pub trait UserInteraction {
  /// Asks a yes/no question. Accepting defaults answers yes.
  fn confirm(&self, message: &str) -> Result<bool>;

  /// Lets the user pick one of `items`. Accepting defaults picks the first one; `None` means
  /// the user cancelled.
  fn select(&self, message: &str, items: &[String]) -> Result<Option<usize>>;

  /// Prints `content`.
  fn reply(&self, content: ResponseContent) -> Result<()>;
}

impl UserInteraction for Cli {
  fn confirm(&self, message: &str) -> Result<bool> {
    if self.accept_defaults {
      return Ok(true);
    }
    Ok(
      Confirm::new()
        .with_prompt(format!("{} {message}", style(PROMPT_PREFIX).cyan()))
        .default(false)
        .interact()?,
    )
  }

  fn select(&self, message: &str, items: &[String]) -> Result<Option<usize>> {
    if self.accept_defaults || items.len() < 2 {
      return Ok((!items.is_empty()).then_some(0));
    }
    Ok(
      Select::new()
        .with_prompt(format!("{} {message}", style(PROMPT_PREFIX).cyan()))
        .items(items)
        .default(0)
        .interact_opt()?,
    )
  }

  fn reply(&self, content: ResponseContent) -> Result<()> {
    match content {
      ResponseContent::Summary(summary) => print_summary(summary),
      ResponseContent::Plan(updates) => {
        println!("{} {} call numbers to write", style(INFO_PREFIX).blue(), updates.len());
        for (i, update) in updates.iter().enumerate() {
          println!(
            "   {} {} {ARROW} {}",
            style(list_prefix(i, updates.len())).dim(),
            style(&update.key).yellow(),
            style(&update.call_number).green()
          );
        }
      },
      ResponseContent::Report(report) => {
        println!(
          "{} Wrote {} call numbers",
          style(SUCCESS_PREFIX).green(),
          style(report.applied.len()).green()
        );
        for (update, e) in &report.failed {
          println!("{} {}: {e}", style(WARNING_PREFIX).yellow(), style(&update.key).yellow());
        }
      },
      ResponseContent::Success(message) => println!("{} {message}", style(SUCCESS_PREFIX).green()),
      ResponseContent::Info(message) => println!("{} {message}", style(INFO_PREFIX).blue()),
      ResponseContent::Warning(message) => {
        println!("{} {message}", style(WARNING_PREFIX).yellow())
      },
    }
    Ok(())
  }
}

/// Prints the outcome of an export, listing every failed attachment.
fn print_summary(summary: &RunSummary) {
  println!(
    "{} Exported {} files from {} entries",
    style(SUCCESS_PREFIX).green(),
    style(summary.exported()).green(),
    summary.entries
  );
  let failed: Vec<_> = summary.failures().collect();
  if failed.is_empty() {
    return;
  }
  println!("{} {} attachments skipped", style(WARNING_PREFIX).yellow(), failed.len());
  for (i, result) in failed.iter().enumerate() {
    println!(
      "   {} {} ({}): {}",
      style(list_prefix(i, failed.len())).dim(),
      style(&result.attachment_key).yellow(),
      result.entry_key,
      result.error.as_deref().unwrap_or("unknown error")
    );
  }
}

/// Tree prefix of item `i` in a list of `len` items.
fn list_prefix(i: usize, len: usize) -> &'static str {
  if i + 1 == len {
    LAST_ITEM_PREFIX
  } else {
    ITEM_PREFIX
  }
}
