//! End-to-end scenarios driving the library API directly: compile a
//! program, run it against an in-memory `Io`, check what it produced.

use simpletron::machine::{Io, RuntimeError, Simpletron, Status};
use simpletron::middle::Compiler;
use std::collections::VecDeque;
use std::io;

#[derive(Default)]
struct FakeIo {
    words: VecDeque<i32>,
    output: Vec<i32>,
}

impl FakeIo {
    fn with_inputs(words: impl IntoIterator<Item = i32>) -> Self {
        FakeIo { words: words.into_iter().collect(), output: Vec::new() }
    }
}

impl Io for FakeIo {
    fn read_word(&mut self) -> io::Result<i32> {
        self.words.pop_front().ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no more input"))
    }
    fn write_word(&mut self, value: i32) -> io::Result<()> {
        self.output.push(value);
        Ok(())
    }
    fn read_str(&mut self) -> io::Result<String> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "not used in these scenarios"))
    }
    fn write_str(&mut self, _text: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "not used in these scenarios"))
    }
}

fn run(source: &str, inputs: impl IntoIterator<Item = i32>) -> (Status, Vec<i32>) {
    let image = Compiler::compile_program(source).expect("program should compile");
    let mut vm = Simpletron::load(&image);
    let mut io = FakeIo::with_inputs(inputs);
    let status = vm.run(&mut io).expect("program should run without a runtime error");
    (status, io.output)
}

#[test]
fn hello_add_reads_two_numbers_and_prints_their_sum() {
    let source = "\
10 input a, b
20 let c = a + b
30 print c
40 end
";
    let (status, output) = run(source, [2, 3]);
    assert_eq!(status, Status::Halted);
    assert_eq!(output, vec![5]);
}

#[test]
fn unary_minus_and_precedence() {
    // -2 + 3 * 4 == 10, multiplication must bind tighter than the leading
    // unary minus rewrite and the trailing addition.
    let source = "\
10 let x = -2 + 3 * 4
20 print x
30 end
";
    let (status, output) = run(source, []);
    assert_eq!(status, Status::Halted);
    assert_eq!(output, vec![10]);
}

#[test]
fn power_is_right_associative() {
    // 2^3^2 == 2^(3^2) == 2^9 == 512, not (2^3)^2 == 64.
    let source = "\
10 let x = 2^3^2
20 print x
30 end
";
    let (status, output) = run(source, []);
    assert_eq!(status, Status::Halted);
    assert_eq!(output, vec![512]);
}

#[test]
fn forward_goto_skips_a_statement() {
    let source = "\
10 goto 30
20 let x = 999
30 let x = 1
40 print x
50 end
";
    let (status, output) = run(source, []);
    assert_eq!(status, Status::Halted);
    assert_eq!(output, vec![1]);
}

#[test]
fn counted_loop_sums_one_through_five() {
    // bare `next`, matching the canonical counted-loop scenario exactly: no
    // variable name required, it just pops the innermost open `for`.
    let source = "\
10 let total = 0
20 for i = 1 to 5
30 let total = total + i
40 next
50 print total
60 end
";
    let (status, output) = run(source, []);
    assert_eq!(status, Status::Halted);
    assert_eq!(output, vec![15]);
}

#[test]
fn descending_loop_with_negative_step() {
    let source = "\
10 let total = 0
20 for i = 5 to 1 step -1
30 let total = total + i
40 next
50 print total
60 end
";
    let (status, output) = run(source, []);
    assert_eq!(status, Status::Halted);
    assert_eq!(output, vec![15]);
}

#[test]
fn if_not_equal_branches_to_an_else_arm() {
    let source = "\
10 input a
20 if a != 0 goto 50
30 print 0
40 goto 60
50 print 1
60 end
";
    let (status, output) = run(source, [7]);
    assert_eq!(status, Status::Halted);
    assert_eq!(output, vec![1]);

    let (status_zero, output_zero) = run(source, [0]);
    assert_eq!(status_zero, Status::Halted);
    assert_eq!(output_zero, vec![0]);
}

#[test]
fn divide_by_zero_surfaces_as_a_runtime_error() {
    let source = "\
10 let z = 0
20 let x = 5 / z
30 end
";
    let image = Compiler::compile_program(source).unwrap();
    let mut vm = Simpletron::load(&image);
    let mut io = FakeIo::default();
    let err = vm.run(&mut io).unwrap_err();
    assert!(matches!(err, RuntimeError::DivideByZero { .. }));
}
