pub mod poller;
pub mod epoll;
pub mod listener;
pub mod http;
pub mod connection;
pub mod reactor;
