mod lifecycle;
mod provision;
