mod error;
mod provision;

// The fake executable is a shell script.
#[cfg(unix)]
mod helpers;
#[cfg(unix)]
mod lifecycle;
