//! Line-based terminal game loop.

use std::io::{BufRead, Write};

use strictly_digits::{
    GameError, GameErrorKind, OutcomeRecorder, SessionStatus, SessionStore, StatisticsSource,
    UserId,
};
use tracing::{info, instrument, warn};

use crate::service::GameService;

const HELP: &str = "Enter a 5-digit guess, or one of: new, stats, help, quit";

/// Plays games for `user`, reading commands from `input` until EOF or `quit`.
///
/// Rule violations are reported and play continues; storage failures end the
/// loop with an error.
///
/// # Errors
///
/// Returns an error on I/O failure or when the game backend fails.
#[instrument(skip(service, input, output))]
pub fn run_play<S, R>(
    service: &GameService<S, R>,
    user: UserId,
    input: impl BufRead,
    mut output: impl Write,
) -> anyhow::Result<()>
where
    S: SessionStore,
    R: OutcomeRecorder + StatisticsSource,
{
    let session = match service.current_game(user) {
        Ok(session) if !session.status().is_terminal() => session,
        _ => service.new_game(user)?,
    };
    info!(session_id = %session.id(), "Terminal play started");
    writeln!(output, "New game started. {}", HELP)?;

    for line in input.lines() {
        let line = line?;
        let command = line.trim();

        match command {
            "" => continue,
            "quit" | "exit" => break,
            "help" => writeln!(output, "{}", HELP)?,
            "new" => {
                service.new_game(user)?;
                writeln!(output, "New game started.")?;
            }
            "stats" => {
                let stats = service.user_statistics(user)?;
                writeln!(
                    output,
                    "Games: {}  Wins: {}  Average moves: {:.2}  Win ratio: {:.2}%",
                    stats.total_games(),
                    stats.total_wins(),
                    stats.average_moves(),
                    stats.win_ratio_percent()
                )?;
            }
            guess => match service.guess(user, guess) {
                Ok(result) => {
                    writeln!(output, "{}  {}", guess, result.feedback)?;
                    if *result.session.status() == SessionStatus::Won {
                        writeln!(
                            output,
                            "Solved in {} moves! Type 'new' to play again.",
                            result.session.moves()
                        )?;
                    }
                }
                Err(err) => report(&mut output, err)?,
            },
        }
    }

    writeln!(output, "Bye.")?;
    Ok(())
}

fn report(output: &mut impl Write, err: GameError) -> anyhow::Result<()> {
    match err.kind() {
        GameErrorKind::StorageFailure(_) => Err(err.into()),
        GameErrorKind::SessionTerminated(_) | GameErrorKind::NoActiveSession(_) => {
            warn!(error = %err, "Guess on finished game");
            writeln!(output, "This game is over. Type 'new' to start another.")?;
            Ok(())
        }
        GameErrorKind::InvalidFormat(_) => {
            writeln!(output, "A guess must be exactly 5 digits.")?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use strictly_digits::{Code, GameSession, MemoryRecorder, MemorySessionStore};

    #[test]
    fn test_play_until_win() {
        let store = MemorySessionStore::new();
        let user = UserId::new(1);
        store
            .put(GameSession::with_target(user, Code::parse("13579").expect("valid")))
            .expect("put");
        let service = GameService::new(store, MemoryRecorder::new());

        let input = Cursor::new("abc\n11111\n13579\n13579\nstats\nquit\n");
        let mut output = Vec::new();
        run_play(&service, user, input, &mut output).expect("play");

        let text = String::from_utf8(output).expect("utf8");
        assert!(text.contains("A guess must be exactly 5 digits."));
        assert!(text.contains("11111  correct, wrong, wrong, wrong, wrong"));
        assert!(text.contains("Solved in 2 moves!"));
        assert!(text.contains("This game is over."));
        assert!(text.contains("Games: 1  Wins: 1"));
    }
}
