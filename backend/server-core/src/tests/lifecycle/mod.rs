mod process;
mod readiness;
mod spawn;
