// The fake executable is a shell script.
#[cfg(unix)]
mod run;
