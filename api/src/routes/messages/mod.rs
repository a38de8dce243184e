pub mod message_request;
pub mod message_response;
pub mod messages_route;
