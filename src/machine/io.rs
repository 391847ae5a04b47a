//! The machine's I/O boundary: a small trait so the fetch-execute loop
//! never talks to the terminal directly, keeping `Simpletron::run` testable
//! against an in-memory double instead of real stdin/stdout.

use std::io::{self, Write};

/// Reads words and strings in, writes words and strings out. A `Word` is
/// passed as `i32` here since `READ` must be able to observe the
/// out-of-range `STOP_VALUE` sentinel, which doesn't fit in a [`crate::word::Word`].
pub trait Io {
    fn read_word(&mut self) -> io::Result<i32>;
    fn write_word(&mut self, value: i32) -> io::Result<()>;
    fn read_str(&mut self) -> io::Result<String>;
    fn write_str(&mut self, text: &str) -> io::Result<()>;
}

/// The real terminal: prompts on stdout, reads from stdin.
pub struct StdIo;

impl Io for StdIo {
    fn read_word(&mut self) -> io::Result<i32> {
        loop {
            print!("? ");
            io::stdout().flush()?;
            let mut line = String::new();
            if io::stdin().read_line(&mut line)? == 0 {
                return Ok(crate::word::STOP_VALUE);
            }
            match line.trim().parse::<i32>() {
                Ok(value) => return Ok(value),
                Err(_) => println!("Invalid input, please re-enter this value."),
            }
        }
    }

    fn write_word(&mut self, value: i32) -> io::Result<()> {
        println!("{value}");
        Ok(())
    }

    fn read_str(&mut self) -> io::Result<String> {
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn write_str(&mut self, text: &str) -> io::Result<()> {
        println!("{text}");
        Ok(())
    }
}
