mod repository;
mod scratch;
