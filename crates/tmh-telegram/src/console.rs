use async_trait::async_trait;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin},
    sync::Mutex,
};

use tmh_core::{errors::Error, ports::ChallengeProvider, Result};

/// Login challenge answered on the terminal.
pub struct ConsoleChallenge<R = BufReader<Stdin>> {
    lines: Mutex<Lines<R>>,
}

impl ConsoleChallenge {
    pub fn stdin() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin + Send> ConsoleChallenge<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: Mutex::new(reader.lines()),
        }
    }

    async fn ask(&self, prompt: &str, what: &str) -> Result<String> {
        let mut out = tokio::io::stdout();
        out.write_all(prompt.as_bytes()).await?;
        out.flush().await?;

        let line = self.lines.lock().await.next_line().await?;
        let answer = line.unwrap_or_default();
        let answer = answer.trim_end_matches('\r');
        if answer.trim().is_empty() {
            return Err(Error::Auth(format!("no {what} entered")));
        }
        Ok(answer.to_string())
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> ChallengeProvider for ConsoleChallenge<R> {
    async fn phone(&self) -> Result<String> {
        Ok(self
            .ask("Phone number (international format): ", "phone number")
            .await?
            .trim()
            .to_string())
    }

    async fn code(&self) -> Result<String> {
        Ok(self
            .ask("Login code: ", "login code")
            .await?
            .trim()
            .to_string())
    }

    async fn password(&self) -> Result<String> {
        self.ask("Two-step verification password: ", "password")
            .await
    }
}
