#[macro_use]
extern crate clap;
extern crate crossbeam;
extern crate crossbeam_channel;
extern crate prio_relay_lib as lib;
extern crate serde_json;
#[macro_use]
extern crate slog;
extern crate slog_async;
extern crate slog_term;

use crossbeam_channel::Sender;
use lib::{settings, Item};
use slog::{Drain, Logger};
use std::io::{self, BufRead, Write};
use std::process;

mod util;
use util::InputFormat;

#[derive(Clone)]
struct Options {
    format: InputFormat,
    batch: bool,
    settings: settings::Relay,
}

impl Options {
    fn new() -> Options {
        Options {
            format: InputFormat::default(),
            batch: false,
            settings: settings::Relay::new(),
        }
    }

    /// Read all of the input before emitting anything
    ///
    /// Items go through a rendezvous intake, so once the reader is done
    /// the relay holds every one of them.
    fn set_batch(&mut self) -> io::Result<()> {
        self.settings.set_intake_capacity(Some(0))?;
        self.batch = true;
        Ok(())
    }
}

fn create_logger(verbosity: u32) -> Logger {
    let level = match verbosity {
        0 => return Logger::root(slog::Discard, o!()),
        1 => slog::Level::Info,
        2 => slog::Level::Debug,
        _ => slog::Level::Trace,
    };

    // stdout carries payloads
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build();

    if level == slog::Level::Trace {
        // per-item records overflow the async channel
        let drain = std::sync::Mutex::new(drain).fuse();
        Logger::root(slog::LevelFilter::new(drain, level).fuse(), o!())
    } else {
        let drain = slog_async::Async::new(drain.fuse())
            .chan_size(4096)
            .build()
            .fuse();
        Logger::root(slog::LevelFilter::new(drain, level).fuse(), o!())
    }
}

/// Feed items read from `reader` into `intake`
///
/// Returns the number of items sent. `intake` is dropped on return,
/// which lets the relay drain.
fn input_reader_thread<R>(
    reader: R,
    format: InputFormat,
    intake: Sender<Item>,
    log: Logger,
) -> io::Result<u64>
where
    R: BufRead,
{
    let mut count = 0;

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let item = util::parse_item(&line, format).map_err(|e| {
            io::Error::new(e.kind(), format!("line {}: {}", i + 1, e))
        })?;
        trace!(log, "read"; "line" => i + 1, "priority" => item.priority());

        if intake.send(item).is_err() {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "relay stopped accepting items",
            ));
        }
        count += 1;
    }

    debug!(log, "input finished"; "items" => count);
    Ok(count)
}

fn reader_panicked<E>(_: E) -> io::Error {
    io::Error::new(io::ErrorKind::Other, "input reader panicked")
}

/// Relay lines of `input` to `output`, highest priority first
///
/// Returns the number of items read.
fn relay_stream<R, W>(
    input: R,
    mut output: W,
    options: &Options,
    log: &Logger,
) -> io::Result<u64>
where
    R: BufRead + Send,
    W: Write,
{
    let lib::Endpoints {
        intake,
        emit,
        handle,
    } = lib::start(&options.settings, log.clone())?;

    let format = options.format;
    let res = crossbeam::scope(|scope| {
        let reader = scope.spawn({
            let log = log.clone();
            move |_| input_reader_thread(input, format, intake, log)
        });

        let mut write_output = || -> io::Result<()> {
            let mut written = 0u64;
            for payload in emit.iter() {
                writeln!(output, "{}", payload)?;
                written += 1;
            }
            output.flush()?;
            info!(log, "Output finished"; "payloads" => written);
            Ok(())
        };

        if options.batch {
            let read = reader.join().map_err(reader_panicked)?;
            write_output()?;
            read
        } else {
            write_output()?;
            reader.join().map_err(reader_panicked)?
        }
    });

    let res = res.map_err(|e| {
        io::Error::new(io::ErrorKind::Other, format!("{:?}", e))
    })?;

    // on an output error the relay may still be blocked on `emit`
    drop(emit);
    let relay_res = handle.join();

    let read = res?;
    relay_res
        .map_err(|_| io::Error::new(io::ErrorKind::Other, "relay panicked"))?;
    Ok(read)
}

fn run() -> io::Result<()> {
    let matches = clap_app!(
        prio_relay =>
        (version: env!("CARGO_PKG_VERSION"))
        (about: "Reorder prioritized items read from stdin, highest priority first")
        (@arg verbose: -v ... "Increase debugging level")
        (@arg FORMAT: --format possible_values(&["plain", "json"]) +takes_value "Input line format. Default: plain")
        (@arg BATCH: --batch conflicts_with[EMIT_CAPACITY] "Read all of the input before emitting anything")
        (@arg EMIT_CAPACITY: --("emit-capacity") {util::validate_capacity} +takes_value "Payloads allowed to wait for the consumer outside the relay. Default: 0")
        )
        .get_matches();

    let mut options = Options::new();
    if matches.is_present("BATCH") {
        options.set_batch()?;
    }

    if let Some(format) = matches.value_of("FORMAT") {
        options.format = format.parse()?;
    }
    if let Some(capacity) = matches.value_of("EMIT_CAPACITY") {
        let capacity = capacity.parse().map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "invalid capacity")
        })?;
        options.settings.set_emit_capacity(capacity)?;
    }

    let log = create_logger(matches.occurrences_of("verbose") as u32);

    info!(log, "Starting relay";
          "format" => format!("{:?}", options.format),
          "batch" => options.batch,
          "emit-capacity" => options.settings.emit_capacity());

    let stdin = io::BufReader::new(io::stdin());
    let stdout = io::stdout();
    let read = relay_stream(stdin, stdout.lock(), &options, &log)?;
    debug!(log, "Relay finished"; "items" => read);
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(-1);
    }
}

#[test]
fn batch_output_is_sorted() {
    let mut options = Options::new();
    options.set_batch().unwrap();
    let log = Logger::root(slog::Discard, o!());

    let mut input = String::from("3 a\n\n99 b\n1 c\n");
    for i in 0..500 {
        input.push_str(&format!("{} n{}\n", (i * 7919) % 101 - 50, i));
    }

    let mut output = vec![];
    let read =
        relay_stream(io::Cursor::new(input), &mut output, &options, &log)
            .unwrap();
    assert_eq!(read, 503);

    let output = String::from_utf8(output).unwrap();
    let payloads: Vec<&str> = output.lines().collect();
    assert_eq!(payloads.len(), 503);
    assert_eq!(payloads[0], "b");
    assert!(payloads.contains(&"a"));
    assert!(payloads.contains(&"c"));

    let priority = |p: &str| -> i64 {
        match p {
            "a" => 3,
            "b" => 99,
            "c" => 1,
            _ => {
                let i: i64 = p[1..].parse().unwrap();
                (i * 7919) % 101 - 50
            }
        }
    };
    let priorities: Vec<i64> = payloads.iter().map(|p| priority(*p)).collect();
    assert!(priorities.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn batch_stops_at_malformed_line() {
    let mut options = Options::new();
    options.set_batch().unwrap();
    let log = Logger::root(slog::Discard, o!());

    let mut output = vec![];
    let err = relay_stream(
        io::Cursor::new("1 a\n5 b\nnot-a-number c\n7 d\n"),
        &mut output,
        &options,
        &log,
    )
    .unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    assert!(err.to_string().starts_with("line 3:"));
    assert_eq!(String::from_utf8(output).unwrap(), "b\na\n");
}
