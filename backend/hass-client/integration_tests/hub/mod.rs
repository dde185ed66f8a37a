mod connect;
mod events;
mod requests;
