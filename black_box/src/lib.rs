//! Logger writing every record to a timestamped file and to stdout from a dedicated thread.

#[macro_use]
extern crate lazy_static;

use chrono::{DateTime, Local};
use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::{
	collections::VecDeque,
	fs::{File, OpenOptions},
	io::{self, Write},
	path::{Path, PathBuf},
	thread,
	thread::JoinHandle,
	time::{Duration, Instant},
};

lazy_static! {
	static ref BLACK_BOX_CHANNEL: (Sender<Message>, Receiver<Message>) = unbounded::<Message>();
	static ref BLACK_BOX_LOGGER: BlackBoxLogger = BlackBoxLogger {
		start_instant: Instant::now()
	};
}

enum Message {
	Log(String),
	Flush,
}

/// Lines kept while the file cannot be written, oldest dropped first.
const MAX_PENDING_LEN: usize = 4096;

pub struct BlackBox {
	file: File,
	path: PathBuf,
	buffer: VecDeque<String>,
	echo: bool,
	failed_flushes: u32,
	dropped_lines: usize,
}

impl BlackBox {
	/// Creates `<prefix>_<time>_<date>.log` in `directory`.
	pub fn new<P: AsRef<Path>>(directory: P, prefix: &str) -> io::Result<Self> {
		let path = directory.as_ref().join(log_file_name(prefix, &Local::now()));

		let file = OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(true)
			.open(&path)?;

		Ok(BlackBox {
			file,
			path,
			buffer: VecDeque::<String>::new(),
			echo: true,
			failed_flushes: 0,
			dropped_lines: 0,
		})
	}

	/// Disables the copy of each line on stdout.
	pub fn quiet(mut self) -> Self {
		self.echo = false;
		self
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn push(&mut self, line: String) {
		if self.buffer.len() >= MAX_PENDING_LEN {
			self.buffer.pop_front();
			self.dropped_lines += 1;
		}
		self.buffer.push_back(line);
	}

	/// Only the first of consecutive failures is reported, recovery reports the count.
	fn try_flush(&mut self) {
		match self.flush() {
			Ok(()) => {
				if self.failed_flushes > 0 {
					let line = format!(
						"Black box recovered after {} failed flushes, {} lines dropped",
						self.failed_flushes, self.dropped_lines
					);
					self.failed_flushes = 0;
					self.dropped_lines = 0;
					self.push(line);
				}
			}
			Err(e) => {
				if self.failed_flushes == 0 {
					self.push(format!("Failed to flush black box: {}", e));
				}
				self.failed_flushes = self.failed_flushes.saturating_add(1);
			}
		}
	}

	fn flush(&mut self) -> io::Result<()> {
		while let Some(message) = self.buffer.pop_front() {
			if let Err(e) = writeln!(self.file, "{}", message) {
				self.buffer.push_front(message);
				return Err(e);
			}
			if self.echo {
				println!("{}", message);
			}
		}
		self.file.flush()
	}

	fn receive_loop(&mut self) {
		const RECEIVE_TIMEOUT: Duration = Duration::from_millis(500);
		const MAX_BUFFER_LEN: usize = 8;

		while let Ok(message) = BLACK_BOX_CHANNEL.1.recv_timeout(RECEIVE_TIMEOUT) {
			match message {
				Message::Log(content) => self.push(content),
				Message::Flush => self.try_flush(),
			}

			if self.buffer.len() > MAX_BUFFER_LEN {
				self.try_flush();
			}
		}

		if !self.buffer.is_empty() {
			self.try_flush();
		}
	}

	/// Installs the global logger and starts the writer thread. Fails if a logger is
	/// already installed.
	pub fn spawn(mut self, level_filter: LevelFilter) -> Result<JoinHandle<()>, SetLoggerError> {
		log::set_logger(&*BLACK_BOX_LOGGER)?;
		log::set_max_level(level_filter);

		Ok(thread::spawn(move || loop {
			self.receive_loop()
		}))
	}
}

pub fn log_file_name(prefix: &str, now: &DateTime<Local>) -> String {
	format!("{}_{}.log", prefix, now.format("%H-%M-%S_%d-%m-%Y"))
}

/// `[seconds since start][LEVEL][module] message`, errors also carry `(file:line)`.
fn format_record(elapsed: Duration, record: &Record) -> String {
	let module = record.module_path().unwrap_or("unknown");

	if record.level() == Level::Error {
		format!(
			"[{:.3}][{:?}][{}] {} ({}:{})",
			elapsed.as_secs_f32(),
			record.level(),
			module,
			record.args(),
			record.file().unwrap_or("unknown"),
			record.line().unwrap_or(0)
		)
	} else {
		format!(
			"[{:.3}][{:?}][{}] {}",
			elapsed.as_secs_f32(),
			record.level(),
			module,
			record.args(),
		)
	}
}

struct BlackBoxLogger {
	start_instant: Instant,
}

impl Log for BlackBoxLogger {
	fn enabled(&self, metadata: &Metadata) -> bool {
		metadata.level() <= log::max_level()
	}

	fn log(&self, record: &Record) {
		if self.enabled(record.metadata()) {
			let formatted = format_record(self.start_instant.elapsed(), record);
			// The receiver lives in the same static, sending cannot fail
			let _ = BLACK_BOX_CHANNEL.0.send(Message::Log(formatted));
		}
	}

	fn flush(&self) {
		let _ = BLACK_BOX_CHANNEL.0.send(Message::Flush);
	}
}
