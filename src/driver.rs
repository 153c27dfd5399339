//! Line-oriented JSON driver for the triage engine.
//!
//! Reads one command per line, writes one envelope per line. Blank lines
//! are skipped; a line that is not a valid command gets a `BAD_REQUEST`
//! envelope and the loop continues.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::triage::{AnswerQuestionRequest, StartSessionRequest, TriageEngine, TriageError};
use crate::session_store::SessionId;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    Start(StartSessionRequest),
    Answer(AnswerQuestionRequest),
    Assess { session_id: SessionId },
    Sweep,
}

/// Serve commands from `input` until EOF. Returns the number of commands
/// answered.
pub fn serve<R: BufRead, W: Write>(
    engine: &TriageEngine,
    input: R,
    mut output: W,
) -> std::io::Result<usize> {
    let mut handled = 0;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Command>(&line) {
            Ok(command) => dispatch(engine, command, &mut output)?,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected malformed command");
                let err = TriageError::InvalidRequest(e.to_string());
                write_envelope(&mut output, &Envelope::<()>::from(Err(err)))?;
            }
        }
        handled += 1;
    }
    Ok(handled)
}

fn dispatch<W: Write>(engine: &TriageEngine, command: Command, output: &mut W) -> std::io::Result<()> {
    match command {
        Command::Start(req) => write_envelope(output, &Envelope::from(engine.start_session(req))),
        Command::Answer(req) => write_envelope(output, &Envelope::from(engine.answer_question(req))),
        Command::Assess { session_id } => {
            write_envelope(output, &Envelope::from(engine.assess(&session_id)))
        }
        Command::Sweep => write_envelope(output, &Envelope::from(engine.sweep_sessions())),
    }
}

fn write_envelope<W: Write, T: Serialize>(output: &mut W, envelope: &Envelope<T>) -> std::io::Result<()> {
    serde_json::to_writer(&mut *output, envelope)?;
    output.write_all(b"\n")?;
    output.flush()
}
