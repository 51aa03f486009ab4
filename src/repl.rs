//! Interactive terminal chat over a single session.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use parley_core::ids::SessionId;
use parley_engine::ChatService;

const PROMPT: &str = "You: ";

enum Command {
    Reset,
    History,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line {
        "/reset" => Some(Command::Reset),
        "/history" => Some(Command::History),
        "/quit" | "/exit" => Some(Command::Quit),
        _ => None,
    }
}

/// Run the read-chat-print loop until `/quit` or end of input.
///
/// Blank lines are ignored. Generation errors are printed and the loop
/// continues with the transcript unchanged.
pub async fn run<R, W>(
    chat: &ChatService,
    session_id: &SessionId,
    mut input: R,
    output: &mut W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();
    loop {
        output.write_all(PROMPT.as_bytes()).await?;
        output.flush().await?;

        line.clear();
        if input.read_line(&mut line).await? == 0 {
            output.write_all(b"\n").await?;
            break;
        }
        let message = line.trim_end_matches(['\r', '\n']);
        if message.trim().is_empty() {
            continue;
        }

        match parse_command(message.trim()) {
            Some(Command::Quit) => break,
            Some(Command::Reset) => {
                chat.reset(session_id);
                output.write_all(b"(conversation cleared)\n").await?;
            }
            Some(Command::History) => {
                let exchanges = chat.history(session_id).unwrap_or_default();
                if exchanges.is_empty() {
                    output.write_all(b"(no history)\n").await?;
                }
                for ex in exchanges {
                    output
                        .write_all(format!("You: {}\nBot: {}\n", ex.user, ex.bot).as_bytes())
                        .await?;
                }
            }
            None => match chat.chat(session_id, message).await {
                Ok(reply) => {
                    output
                        .write_all(format!("Bot: {}\n", reply.reply).as_bytes())
                        .await?;
                }
                Err(e) => {
                    output.write_all(format!("Error: {e}\n").as_bytes()).await?;
                }
            },
        }
    }
    output.flush().await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parley_core::errors::GenerateError;
    use parley_engine::SessionRegistry;
    use parley_llm::{MockGenerator, MockResponse};

    use super::*;

    fn service(mock: Arc<MockGenerator>) -> ChatService {
        ChatService::new(mock, Arc::new(SessionRegistry::new(12, 8).unwrap()))
    }

    async fn drive(chat: &ChatService, script: &str) -> String {
        let mut out = Vec::new();
        run(chat, &SessionId::from_raw("repl"), script.as_bytes(), &mut out)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn prints_replies_until_eof() {
        let mock = Arc::new(MockGenerator::new(vec![
            MockResponse::reply("Hello there"),
            MockResponse::reply("I like hiking"),
        ]));
        let chat = service(Arc::clone(&mock));

        let out = drive(&chat, "Hi\nWhat's your favorite hobby?\n").await;
        assert_eq!(
            out,
            "You: Bot: Hello there\nYou: Bot: I like hiking\nYou: \n"
        );
        assert_eq!(mock.prompts()[1], "Hi\nHello thereWhat's your favorite hobby?");
    }

    #[tokio::test]
    async fn quit_stops_reading() {
        let mock = Arc::new(MockGenerator::always("ok"));
        let chat = service(Arc::clone(&mock));

        let out = drive(&chat, "/quit\nnever sent\n").await;
        assert_eq!(out, "You: ");
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn history_and_reset() {
        let chat = service(Arc::new(MockGenerator::always("pong")));

        let out = drive(&chat, "ping\n/history\n/reset\n/history\n").await;
        assert!(out.contains("You: ping\nBot: pong\n"), "got: {out}");
        assert!(out.contains("(conversation cleared)"));
        assert!(out.ends_with("(no history)\nYou: \n"), "got: {out}");
    }

    #[tokio::test]
    async fn errors_are_reported_and_loop_continues() {
        let mock = Arc::new(MockGenerator::new(vec![
            MockResponse::Error(GenerateError::NetworkError("connection refused".into())),
            MockResponse::reply("back online"),
        ]));
        let chat = service(Arc::clone(&mock));

        let out = drive(&chat, "hello\nhello again\n").await;
        assert!(out.contains("Error: "), "got: {out}");
        assert!(out.contains("Bot: back online"));
        // The failed turn was not recorded.
        assert_eq!(mock.prompts()[1], "hello again");
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let mock = Arc::new(MockGenerator::always("ok"));
        let chat = service(Arc::clone(&mock));

        drive(&chat, "\n   \n").await;
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn conversation_outlives_long_idle() {
        let mock = Arc::new(MockGenerator::new(vec![
            MockResponse::reply("hello"),
            MockResponse::reply("fine"),
        ]));
        let chat = service(Arc::clone(&mock));

        drive(&chat, "hi\n").await;
        tokio::time::advance(std::time::Duration::from_secs(3700)).await;
        drive(&chat, "how are you\n").await;
        assert_eq!(mock.prompts()[1], "hi\nhellohow are you");
    }
}
