use crate::config::ServerConfig;
use crate::{Error, Result, paths};
use hll_engine::CommandSet;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Request/response channel to the command server.
pub trait CommandChannel {
    /// Send one length-prefixed payload and read the length-prefixed reply.
    fn post(&mut self, payload: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status: String,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

/// Issue one `{request, data}` call and unwrap the `{status, reason, data}`
/// envelope. An `err` status becomes a runtime failure with the server's
/// reason.
pub fn request(chan: &mut dyn CommandChannel, name: &str, data: Value) -> Result<Value> {
    let payload = serde_json::to_string(&json!({ "request": name, "data": data }))?;
    let raw = chan.post(&payload)?;
    let envelope: Envelope = serde_json::from_str(&raw)?;
    if envelope.status == "ok" {
        Ok(envelope.data.unwrap_or(Value::Null))
    } else {
        Err(Error::Server(
            envelope
                .reason
                .unwrap_or_else(|| "unspecified failure".to_string()),
        ))
    }
}

/// Fetch the command schema dictionary.
pub fn fetch_commands(chan: &mut dyn CommandChannel) -> Result<CommandSet> {
    match request(chan, "get_commands", json!({}))? {
        Value::Object(map) => Ok(CommandSet::new(map)),
        _ => Err(Error::Server(
            "get_commands returned a non-object schema".to_string(),
        )),
    }
}

/// Stream-socket client that guarantees exactly one command server per
/// host: a failed connect falls into a lock-recheck-spawn sequence, and
/// the spawn only happens after a second connect attempt under the lock
/// also fails.
#[derive(Debug)]
pub struct ServerClient {
    stream: UnixStream,
}

impl ServerClient {
    pub fn connect(config: &ServerConfig, data_dir: &Path) -> Result<Self> {
        match UnixStream::connect(&config.socket_path) {
            Ok(stream) => return Ok(Self { stream }),
            Err(err) if is_retryable(&err) => {}
            Err(err) => return Err(connect_error(&err)),
        }

        let mut child = None;
        {
            let _lock = LockFile::acquire(&config.lock_path)?;

            // Re-check under the lock: someone else may have won the race.
            match UnixStream::connect(&config.socket_path) {
                Ok(stream) => return Ok(Self { stream }),
                Err(err) if is_retryable(&err) => {
                    child = Some(spawn_server(config, data_dir)?);
                }
                Err(err) => return Err(connect_error(&err)),
            }
        }

        let timeout = if child.is_some() {
            config.spawn_timeout_ms
        } else {
            config.attach_timeout_ms
        };
        connect_with_retry(&config.socket_path, child, timeout)
    }
}

impl CommandChannel for ServerClient {
    fn post(&mut self, payload: &str) -> Result<String> {
        let len = u32::try_from(payload.len())
            .map_err(|_| Error::Socket("request payload too large".to_string()))?;
        self.stream.write_all(&len.to_be_bytes())?;
        self.stream.write_all(payload.as_bytes())?;

        let mut len_buf = [0u8; 4];
        self.stream.read_exact(&mut len_buf)?;
        let resp_len = u32::from_be_bytes(len_buf) as usize;

        let mut buf = vec![0u8; resp_len];
        self.stream.read_exact(&mut buf)?;
        String::from_utf8(buf)
            .map_err(|_| Error::Socket("response payload is not valid UTF-8".to_string()))
    }
}

fn is_retryable(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::NotFound | ErrorKind::ConnectionRefused | ErrorKind::AddrInUse
    )
}

fn connect_error(err: &std::io::Error) -> Error {
    Error::Socket(format!("connect failed: {}", err))
}

fn connect_with_retry(
    socket_path: &Path,
    mut child: Option<Child>,
    overall_ms: u64,
) -> Result<ServerClient> {
    let deadline = Instant::now() + Duration::from_millis(overall_ms);
    let mut delay_ms = 25u64;

    loop {
        match UnixStream::connect(socket_path) {
            Ok(stream) => return Ok(ServerClient { stream }),
            Err(err) if is_retryable(&err) => {}
            Err(err) => return Err(connect_error(&err)),
        }

        if let Some(c) = child.as_mut()
            && matches!(c.try_wait(), Ok(Some(_)))
        {
            return Err(Error::Spawn(
                "helper exited before creating socket".to_string(),
            ));
        }

        if Instant::now() >= deadline {
            return Err(Error::Socket(
                "timeout waiting for command server socket".to_string(),
            ));
        }

        std::thread::sleep(Duration::from_millis(delay_ms));
        delay_ms = (delay_ms * 2).min(250);
    }
}

/// Exclusive advisory lock held while deciding whether to spawn.
struct LockFile {
    file: File,
}

impl LockFile {
    fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        loop {
            let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
            if rc == 0 {
                return Ok(Self { file });
            }
            let err = std::io::Error::last_os_error();
            if err.kind() != ErrorKind::Interrupted {
                return Err(Error::Socket(format!("flock failed: {}", err)));
            }
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        unsafe {
            libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
        }
    }
}

/// Spawn the command server detached: new session, stdio redirected to the
/// server log, stdin from /dev/null.
fn spawn_server(config: &ServerConfig, data_dir: &Path) -> Result<Child> {
    let argv = if config.command.is_empty() {
        vec![
            "python3".to_string(),
            "-u".to_string(),
            paths::default_server_script(data_dir).display().to_string(),
        ]
    } else {
        config.command.clone()
    };

    let log_path = paths::server_log_file(data_dir);
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log = File::create(&log_path)?;
    let log_err = log.try_clone()?;

    log::debug!("spawning command server: {:?}", argv);

    let mut command = Command::new(&argv[0]);
    command
        .args(&argv[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err));
    unsafe {
        command.pre_exec(|| {
            libc::setsid();
            Ok(())
        });
    }

    command
        .spawn()
        .map_err(|e| Error::Spawn(format!("{:?}: {}", argv, e)))
}
