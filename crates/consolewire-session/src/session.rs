use std::io::{Read, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use consolewire_frame::{CommandWriter, FrameError, FrameReader, Reply};
use consolewire_json::{extract_with, parse_reply, ExtractMode};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};

/// One command and the reply it produced.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub command: String,
    pub reply: Reply,
    /// Time from sending the command to the end of the reply.
    pub elapsed: Duration,
}

impl Exchange {
    /// Whether the reply ended with the sentinel.
    pub fn is_complete(&self) -> bool {
        self.reply.complete
    }

    /// The reply as UTF-8 text.
    pub fn text(&self) -> Result<&str> {
        Ok(self.reply.text()?)
    }

    /// The embedded JSON text, or an empty string when there is none.
    pub fn json_text(&self, mode: ExtractMode) -> Result<String> {
        Ok(extract_with(self.text()?, mode))
    }

    /// The embedded JSON value, if any.
    pub fn json(&self, mode: ExtractMode) -> Result<Option<Value>> {
        Ok(parse_reply(&self.reply, mode)?)
    }
}

/// An open console session.
///
/// Owns both halves of the connection. Commands go out strictly one at a
/// time: every [`request`](Self::request) reads its reply before returning.
///
/// A reply that misses the read deadline may still arrive later, so after a
/// [`FrameError::NoResponse`] the session refuses further commands with
/// [`SessionError::OutOfSync`].
pub struct Session<R, W> {
    reader: FrameReader<R>,
    writer: CommandWriter<W>,
    config: SessionConfig,
    exchanges: usize,
    dropped: bool,
    /// The command whose reply never arrived.
    unanswered: Option<String>,
}

impl<R: Read, W: Write> Session<R, W> {
    /// Assemble a session from an already-connected reader and writer.
    pub fn from_parts(
        reader: FrameReader<R>,
        writer: CommandWriter<W>,
        config: SessionConfig,
    ) -> Self {
        Self {
            reader,
            writer,
            config,
            exchanges: 0,
            dropped: false,
            unanswered: None,
        }
    }

    /// Consume the console's greeting up to its first prompt.
    pub fn read_banner(&mut self) -> Result<Reply> {
        self.ensure_in_sync()?;
        let reply = self.read_reply_for("<banner>")?;
        self.note_drop(&reply);
        debug!(len = reply.len(), "read console banner");
        Ok(reply)
    }

    /// Send one command and read its reply.
    ///
    /// A dropped connection is not an error: the partial reply comes back
    /// with `complete == false`. Nothing is sent once the session is out of
    /// sync.
    pub fn request(&mut self, command: &str) -> Result<Exchange> {
        self.ensure_in_sync()?;
        let command = command.trim_end();
        let started = Instant::now();
        self.writer.send_command(command)?;
        let reply = self.read_reply_for(command)?;
        Ok(self.finish(command.to_string(), reply, started))
    }

    /// Send `source` flattened onto one line and read the reply.
    ///
    /// `label` names the payload in the returned exchange and in logs.
    pub fn send_payload<P: Read>(&mut self, label: &str, source: P) -> Result<Exchange> {
        self.ensure_in_sync()?;
        let started = Instant::now();
        let sent = self.writer.send_flattened(source)?;
        debug!(label, sent, "sent payload");
        let reply = self.read_reply_for(label)?;
        Ok(self.finish(label.to_string(), reply, started))
    }

    /// Send a local file's contents as one command line and read the reply.
    pub fn send_file(&mut self, path: &Path) -> Result<Exchange> {
        let file = std::fs::File::open(path).map_err(|source| SessionError::File {
            path: path.to_path_buf(),
            source,
        })?;
        self.send_payload(&path.display().to_string(), std::io::BufReader::new(file))
    }

    /// Send the shutdown command and close the connection.
    ///
    /// The console is not expected to acknowledge it.
    pub fn close(mut self) -> Result<()> {
        let command = std::mem::take(&mut self.config.shutdown_command);
        if !command.is_empty() {
            self.writer.send_command(&command)?;
        }
        info!(exchanges = self.exchanges, "session closed");
        Ok(())
    }

    /// Whether any reply so far ended because the peer hung up.
    pub fn saw_drop(&self) -> bool {
        self.dropped
    }

    /// Whether a reply went missing, leaving later replies unattributable.
    pub fn is_out_of_sync(&self) -> bool {
        self.unanswered.is_some()
    }

    /// Number of completed request/reply exchanges.
    pub fn exchanges(&self) -> usize {
        self.exchanges
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Borrow the frame reader.
    pub fn reader(&self) -> &FrameReader<R> {
        &self.reader
    }

    /// Borrow the command writer.
    pub fn writer(&self) -> &CommandWriter<W> {
        &self.writer
    }

    /// Split the session back into its reader and writer without sending the
    /// shutdown command.
    pub fn into_parts(self) -> (FrameReader<R>, CommandWriter<W>) {
        (self.reader, self.writer)
    }

    fn ensure_in_sync(&self) -> Result<()> {
        match &self.unanswered {
            Some(command) => Err(SessionError::OutOfSync {
                command: command.clone(),
            }),
            None => Ok(()),
        }
    }

    fn read_reply_for(&mut self, command: &str) -> Result<Reply> {
        match self.reader.read_reply() {
            Ok(reply) => Ok(reply),
            Err(err @ FrameError::NoResponse { .. }) => {
                warn!(command, "reply missed the read deadline; session out of sync");
                self.unanswered = Some(command.to_string());
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn finish(&mut self, command: String, reply: Reply, started: Instant) -> Exchange {
        let elapsed = started.elapsed();
        self.exchanges += 1;
        self.note_drop(&reply);

        if let Some(threshold) = self.config.slow_reply_threshold {
            if elapsed > threshold {
                warn!(
                    command = %command,
                    elapsed_ms = elapsed.as_millis() as u64,
                    threshold_ms = threshold.as_millis() as u64,
                    "slow reply; console may be throttling commands"
                );
            }
        }

        debug!(
            command = %command,
            len = reply.len(),
            complete = reply.complete,
            elapsed_ms = elapsed.as_millis() as u64,
            "exchange finished"
        );

        Exchange {
            command,
            reply,
            elapsed,
        }
    }

    fn note_drop(&mut self, reply: &Reply) {
        if !reply.complete {
            self.dropped = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::Cursor;

    use consolewire_frame::{FrameError, Sentinel};
    use serde_json::json;

    use super::*;
    use crate::script::TEN_KEY_OBJECT;

    /// Hands out one console write per read call, then EOF. A `None` step
    /// reports an expired read deadline.
    struct ConsoleWrites(VecDeque<Option<Vec<u8>>>);

    impl ConsoleWrites {
        fn new<I, B>(writes: I) -> Self
        where
            I: IntoIterator<Item = B>,
            B: AsRef<[u8]>,
        {
            Self(
                writes
                    .into_iter()
                    .map(|w| Some(w.as_ref().to_vec()))
                    .collect(),
            )
        }

        fn with_stalls(steps: &[Option<&str>]) -> Self {
            Self(
                steps
                    .iter()
                    .map(|step| step.map(|w| w.as_bytes().to_vec()))
                    .collect(),
            )
        }
    }

    impl Read for ConsoleWrites {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let Some(step) = self.0.front_mut() else {
                return Ok(0);
            };
            let Some(front) = step else {
                self.0.pop_front();
                return Err(std::io::ErrorKind::WouldBlock.into());
            };
            let n = front.len().min(buf.len());
            buf[..n].copy_from_slice(&front[..n]);
            front.drain(..n);
            if front.is_empty() {
                self.0.pop_front();
            }
            Ok(n)
        }
    }

    type MemorySession = Session<ConsoleWrites, Cursor<Vec<u8>>>;

    fn memory_session(writes: ConsoleWrites, config: SessionConfig) -> MemorySession {
        let reader = FrameReader::new(writes, config.sentinel.clone());
        let writer = CommandWriter::new(Cursor::new(Vec::new()));
        Session::from_parts(reader, writer, config)
    }

    fn sent_bytes(session: MemorySession) -> String {
        let (_, writer) = session.into_parts();
        String::from_utf8(writer.into_inner().into_inner()).unwrap()
    }

    #[test]
    fn banner_then_request() {
        let writes = ConsoleWrites::new(["\n10240: ", "help\r\nCommands: done\r\n10240: "]);
        let mut session = memory_session(writes, SessionConfig::default());

        let banner = session.read_banner().unwrap();
        assert_eq!(banner.payload.as_ref(), b"\n");

        let exchange = session.request("help  ").unwrap();
        assert_eq!(exchange.command, "help");
        assert!(exchange.is_complete());
        assert_eq!(exchange.text().unwrap(), "help\r\nCommands: done\r\n");
        assert_eq!(exchange.json(ExtractMode::Heuristic).unwrap(), None);
        assert_eq!(session.exchanges(), 1);
        assert_eq!(sent_bytes(session), "help\n");
    }

    #[test]
    fn json_reply_parsed() {
        let reply = format!("{TEN_KEY_OBJECT}\r\n10240: ");
        let writes = ConsoleWrites::new(["\n10240: ", reply.as_str()]);
        let mut session = memory_session(writes, SessionConfig::default());
        session.read_banner().unwrap();

        let exchange = session.request(TEN_KEY_OBJECT).unwrap();
        assert_eq!(
            exchange.json_text(ExtractMode::Heuristic).unwrap(),
            TEN_KEY_OBJECT
        );
        let value = exchange.json(ExtractMode::Heuristic).unwrap().unwrap();
        assert_eq!(value["seven"], json!(7));
    }

    #[test]
    fn dropped_reply_is_reported_not_fatal() {
        let writes = ConsoleWrites::new(["\n10240: ", "hal"]);
        let mut session = memory_session(writes, SessionConfig::default());
        session.read_banner().unwrap();

        let exchange = session.request("halt").unwrap();
        assert!(!exchange.is_complete());
        assert_eq!(exchange.text().unwrap(), "hal");
        assert!(session.saw_drop());

        // Later commands still go out and observe the drop.
        let next = session.request("list").unwrap();
        assert!(!next.is_complete());
        assert!(next.reply.is_empty());
        assert_eq!(sent_bytes(session), "halt\nlist\n");
    }

    #[test]
    fn late_reply_is_never_attributed_to_next_command() {
        let writes = ConsoleWrites::with_stalls(&[
            Some("\n10240: "),
            None,
            Some("help\r\nCommands\r\n10240: "),
            Some("list\r\n10240: "),
        ]);
        let mut session = memory_session(writes, SessionConfig::default());
        session.read_banner().unwrap();

        let err = session.request("help").unwrap_err();
        assert!(matches!(
            err,
            SessionError::Frame(FrameError::NoResponse { .. })
        ));
        assert!(session.is_out_of_sync());

        let err = session.request("list").unwrap_err();
        assert!(matches!(err, SessionError::OutOfSync { ref command } if command == "help"));
        assert!(matches!(
            session.send_payload("Input.json", "{}".as_bytes()),
            Err(SessionError::OutOfSync { .. })
        ));
        assert_eq!(session.exchanges(), 0);
        assert_eq!(sent_bytes(session), "help\n");
    }

    #[test]
    fn missing_banner_puts_session_out_of_sync() {
        let writes = ConsoleWrites::with_stalls(&[None, Some("\n10240: ")]);
        let mut session = memory_session(writes, SessionConfig::default());

        assert!(session.read_banner().is_err());
        assert!(matches!(
            session.request("help"),
            Err(SessionError::OutOfSync { ref command }) if command == "<banner>"
        ));
        assert_eq!(sent_bytes(session), "");
    }

    #[test]
    fn invalid_utf8_reply_is_decode_error() {
        let reply = [0xFF, 0xFE, b'1', b'0', b'2', b'4', b'0', b':', b' '];
        let writes = ConsoleWrites::new([&b"\n10240: "[..], &reply[..]]);
        let mut session = memory_session(writes, SessionConfig::default());
        session.read_banner().unwrap();

        let exchange = session.request("garbage").unwrap();
        assert!(exchange.is_complete());
        let err = exchange.text().unwrap_err();
        assert!(matches!(err, SessionError::Frame(FrameError::Decode(_))));
    }

    #[test]
    fn malformed_json_is_recoverable() {
        let writes = ConsoleWrites::new([
            "\n10240: ",
            "{\"a\":1} and {\"b\"}\r\n10240: ",
            "version 1\r\n10240: ",
        ]);
        let mut session = memory_session(writes, SessionConfig::default());
        session.read_banner().unwrap();

        let bad = session.request("weird").unwrap();
        assert!(matches!(
            bad.json(ExtractMode::Heuristic),
            Err(SessionError::Json(_))
        ));

        let next = session.request("version").unwrap();
        assert_eq!(next.text().unwrap(), "version 1\r\n");
    }

    #[test]
    fn send_payload_flattens_and_reads_reply() {
        let writes = ConsoleWrites::new(["\n10240: ", "{\"a\": 1}\r\n10240: "]);
        let mut session = memory_session(writes, SessionConfig::default());
        session.read_banner().unwrap();

        let exchange = session
            .send_payload("Input.json", "{\r\n\t\"a\": 1\r\n}\r\n".as_bytes())
            .unwrap();
        assert_eq!(exchange.command, "Input.json");
        assert_eq!(
            exchange.json(ExtractMode::Heuristic).unwrap(),
            Some(json!({"a": 1}))
        );
        assert_eq!(sent_bytes(session), "{\"a\": 1}\n");
    }

    #[test]
    fn send_file_missing_is_file_error() {
        let writes = ConsoleWrites::new(Vec::<Vec<u8>>::new());
        let mut session = memory_session(writes, SessionConfig::default());
        let err = session
            .send_file(Path::new("/nonexistent/consolewire/Input.json"))
            .unwrap_err();
        assert!(matches!(err, SessionError::File { .. }));
    }

    #[test]
    fn close_sends_shutdown_command() {
        let sink = SharedSink::default();
        let observed = sink.clone();
        let session = Session::from_parts(
            FrameReader::new(Cursor::new(Vec::new()), Sentinel::default()),
            CommandWriter::new(sink),
            SessionConfig::default(),
        );

        session.close().unwrap();
        assert_eq!(observed.contents(), b"done\n");
    }

    #[test]
    fn empty_shutdown_command_sends_nothing() {
        let sink = SharedSink::default();
        let observed = sink.clone();
        let config = SessionConfig {
            shutdown_command: String::new(),
            ..SessionConfig::default()
        };
        let session = Session::from_parts(
            FrameReader::new(Cursor::new(Vec::new()), Sentinel::default()),
            CommandWriter::new(sink),
            config,
        );
        session.close().unwrap();
        assert!(observed.contents().is_empty());
    }

    #[test]
    fn slow_reply_threshold_does_not_fail_request() {
        let config = SessionConfig {
            slow_reply_threshold: Some(Duration::ZERO),
            ..SessionConfig::default()
        };
        let writes = ConsoleWrites::new(["\n10240: ", "ok\r\n10240: "]);
        let mut session = memory_session(writes, config);
        session.read_banner().unwrap();
        assert!(session.request("ok").unwrap().is_complete());
    }

    #[derive(Clone, Default)]
    struct SharedSink(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl SharedSink {
        fn contents(&self) -> Vec<u8> {
            self.0.lock().unwrap().clone()
        }
    }

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
