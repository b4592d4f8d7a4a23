//! Interactive numbered menu, used when no subcommand is given.

use rxentry_automation::injector::InputBackend;
use rxentry_automation::signature::SignatureHandoff;
use rxentry_provider::SessionProvider;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio_util::sync::CancellationToken;

use crate::app::{Action, App};

/// Menu entries in display order; entry `n` is selected with `n + 1`.
pub const MENU: [Action; 7] = [
    Action::TestConnection,
    Action::ListDrugs,
    Action::RunWorkflow,
    Action::EnterDrugs,
    Action::Submit,
    Action::OpenSignature,
    Action::Complete,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Run(Action),
    Exit,
    Invalid,
}

pub fn parse_choice(input: &str) -> MenuChoice {
    match input.trim().parse::<usize>() {
        Ok(0) => MenuChoice::Exit,
        Ok(n) if n <= MENU.len() => MenuChoice::Run(MENU[n - 1]),
        _ => MenuChoice::Invalid,
    }
}

pub fn menu_text() -> String {
    let mut text = String::from("\nAvailable actions:\n");
    for (i, action) in MENU.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", i + 1, action.label()));
    }
    text.push_str("0. Exit\n");
    text.push_str(&format!("\nSelect action (0-{}): ", MENU.len()));
    text
}

/// Loop until the operator exits, stdin closes, or Ctrl-C is pressed.
/// Action errors are printed and the menu is shown again.
pub async fn run<P, B, H>(app: &mut App<P, B, H>) -> std::io::Result<()>
where
    P: SessionProvider,
    B: InputBackend,
    H: SignatureHandoff,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let shutdown = app.shutdown_token();

    while !shutdown.is_cancelled() {
        stdout.write_all(menu_text().as_bytes()).await?;
        stdout.flush().await?;

        let Some(line) = next_line(&mut lines, &shutdown).await? else {
            break;
        };

        match parse_choice(&line) {
            MenuChoice::Exit => break,
            MenuChoice::Invalid => println!("Invalid choice"),
            MenuChoice::Run(action) => {
                if let Err(e) = app.perform(action).await {
                    tracing::warn!(?action, error = %e, "Action did not complete");
                    println!("{e}");
                }
            }
        }
    }
    Ok(())
}

/// Next input line, or `None` once input ends or shutdown is requested
/// while waiting for it.
pub async fn next_line<R>(
    lines: &mut Lines<R>,
    shutdown: &CancellationToken,
) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        line = lines.next_line() => line,
        _ = shutdown.cancelled() => {
            println!();
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn choices() {
        assert_eq!(parse_choice("0"), MenuChoice::Exit);
        assert_eq!(parse_choice(" 3 \n"), MenuChoice::Run(Action::RunWorkflow));
        assert_eq!(parse_choice("7"), MenuChoice::Run(Action::Complete));
        assert_eq!(parse_choice("8"), MenuChoice::Invalid);
        assert_eq!(parse_choice("run"), MenuChoice::Invalid);
        assert_eq!(parse_choice(""), MenuChoice::Invalid);
    }

    #[test]
    fn menu_lists_every_action() {
        let text = menu_text();
        for action in MENU {
            assert!(text.contains(action.label()));
        }
        assert!(text.contains("0. Exit"));
    }

    #[tokio::test]
    async fn shutdown_interrupts_a_pending_read() {
        // Writer stays open and silent, so the read never completes.
        let (_writer, reader) = tokio::io::duplex(64);
        let mut lines = BufReader::new(reader).lines();
        let shutdown = CancellationToken::new();

        let canceller = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let line = tokio::time::timeout(Duration::from_secs(5), next_line(&mut lines, &shutdown))
            .await
            .expect("read should stop on shutdown")
            .unwrap();
        assert_eq!(line, None);
    }

    #[tokio::test]
    async fn lines_are_returned_until_input_ends() {
        let (mut writer, reader) = tokio::io::duplex(64);
        writer.write_all(b"3\n").await.unwrap();
        drop(writer);

        let mut lines = BufReader::new(reader).lines();
        let shutdown = CancellationToken::new();

        assert_eq!(next_line(&mut lines, &shutdown).await.unwrap().as_deref(), Some("3"));
        assert_eq!(next_line(&mut lines, &shutdown).await.unwrap(), None);
    }
}
