use std::io::{BufRead, Write};
use std::path::PathBuf;

use facecam_core::pipeline::extract_faces_use_case::ExtractionOutcome;
use facecam_core::session::camera_session::Session;
use facecam_core::video::domain::media_source::CameraOpener;

/// A line typed at the session prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartVideo,
    Extract,
    Snapshot(PathBuf),
    List,
    Help,
    Quit,
    Unknown(String),
}

const DEFAULT_SNAPSHOT: &str = "snapshot.png";

const HELP: &str = "\
Commands:
  start-video        open the camera and start live detection
  extract            save every face in the current frame
  snapshot [PATH]    save the current frame with the overlay
  list               show extracted faces
  quit               end the session";

impl Command {
    pub fn parse(line: &str) -> Option<Command> {
        let mut words = line.split_whitespace();
        let command = match words.next()? {
            "start-video" | "start" => Command::StartVideo,
            "extract" => Command::Extract,
            "snapshot" => Command::Snapshot(PathBuf::from(words.next().unwrap_or(DEFAULT_SNAPSHOT))),
            "list" => Command::List,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        };
        Some(command)
    }
}

/// Reads commands from `input` until `quit` or end of input.
///
/// Command failures are reported and the session continues.
pub fn run<R: BufRead, W: Write>(
    session: &mut Session,
    opener: &dyn CameraOpener,
    input: R,
    out: &mut W,
) -> std::io::Result<()> {
    writeln!(out, "{HELP}")?;
    for line in input.lines() {
        let Some(command) = Command::parse(&line?) else {
            continue;
        };
        if command == Command::Quit {
            break;
        }
        execute(session, opener, command, out)?;
    }
    session.stop_video();
    Ok(())
}

fn execute<W: Write>(
    session: &mut Session,
    opener: &dyn CameraOpener,
    command: Command,
    out: &mut W,
) -> std::io::Result<()> {
    match command {
        Command::StartVideo => match session.start_video(opener) {
            Ok(()) => writeln!(out, "Video started"),
            Err(e) => writeln!(out, "Could not start video: {e}"),
        },
        Command::Extract => match session.extract() {
            Ok(ExtractionOutcome::NoFaces) => writeln!(out, "No faces detected!"),
            Ok(ExtractionOutcome::Extracted(report)) => {
                for image in &report.images {
                    match &image.persisted_path {
                        Some(path) => writeln!(out, "Saved {}", path.display())?,
                        None => writeln!(out, "Extracted {} (not saved)", image.file_name)?,
                    }
                }
                for failure in &report.failures {
                    writeln!(out, "Failed: {failure}")?;
                }
                Ok(())
            }
            Err(e) => writeln!(out, "Extraction failed: {e}"),
        },
        Command::Snapshot(path) => match session.annotated_frame() {
            Ok(img) => match img.save(&path) {
                Ok(()) => writeln!(out, "Snapshot written to {}", path.display()),
                Err(e) => writeln!(out, "Could not write snapshot: {e}"),
            },
            Err(e) => writeln!(out, "No snapshot: {e}"),
        },
        Command::List => {
            let list = session.display_list();
            writeln!(out, "{} face(s) extracted", list.len())?;
            for image in list.items() {
                writeln!(
                    out,
                    "  {} {}x{} score {:.2}",
                    image.file_name,
                    image.image.width(),
                    image.image.height(),
                    image.score
                )?;
            }
            Ok(())
        }
        Command::Help => writeln!(out, "{HELP}"),
        Command::Quit => Ok(()),
        Command::Unknown(word) => writeln!(out, "Unknown command '{word}'. Type 'help'."),
    }
}
