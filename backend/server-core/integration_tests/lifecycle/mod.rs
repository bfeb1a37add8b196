mod scenarios;
mod start;
mod stop;
