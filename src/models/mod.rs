pub mod booking;
pub mod cart;
pub mod destination;
pub mod flow;
pub mod itinerary;
pub mod session;
