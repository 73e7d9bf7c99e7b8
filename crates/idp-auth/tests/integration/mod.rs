mod http_flow;
mod scenarios;
mod timeouts;
