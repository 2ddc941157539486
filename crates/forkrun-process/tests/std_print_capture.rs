//! Output written with the std `print!` family inside the child.
//!
//! Runs without the libtest harness so `print!` reaches the real fd 1.

use forkrun_process::{ForkBuilder, Outcome, EXIT_STATUS_FAULT};

fn test_println_line_is_captured() {
    let outcome = ForkBuilder::new(|_ctx| {
        println!("hello");
        Ok(())
    })
    .spawn()
    .unwrap()
    .wait()
    .unwrap();
    assert_eq!(outcome.exit_status(), 0);
    assert_eq!(outcome.retval(), Some(&()));
    assert_eq!(outcome.stdout(), b"hello\n");
}

fn test_partial_line_is_captured_on_clean_exit() {
    let outcome = ForkBuilder::new(|_ctx| {
        print!("partial");
        eprint!("warn-no-newline");
        Ok(1)
    })
    .spawn()
    .unwrap()
    .wait()
    .unwrap();
    assert_eq!(outcome.exit_status(), 0);
    assert_eq!(outcome.retval(), Some(&1));
    assert_eq!(outcome.stdout(), b"partial");
    assert_eq!(outcome.stderr(), b"warn-no-newline");
}

fn test_partial_line_is_captured_before_fault() {
    let outcome: Outcome<i32> = ForkBuilder::new(|_ctx| {
        print!("partial");
        anyhow::bail!("boom")
    })
    .spawn()
    .unwrap()
    .wait()
    .unwrap();
    assert_eq!(outcome.exit_status(), EXIT_STATUS_FAULT);
    assert!(outcome.retval().is_none());
    assert_eq!(outcome.stdout(), b"partial");
    assert!(outcome.stderr_lossy().contains("boom"));
}

fn main() {
    let tests: &[(&str, fn())] = &[
        ("test_println_line_is_captured", test_println_line_is_captured),
        (
            "test_partial_line_is_captured_on_clean_exit",
            test_partial_line_is_captured_on_clean_exit,
        ),
        (
            "test_partial_line_is_captured_before_fault",
            test_partial_line_is_captured_before_fault,
        ),
    ];
    for (name, test) in tests {
        test();
        eprintln!("test {} ... ok", name);
    }
}
