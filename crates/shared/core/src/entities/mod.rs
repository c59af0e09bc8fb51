mod order;
mod order_status;
mod order_type;
mod position;
mod side;

pub use order::Order;
pub use order_status::OrderStatus;
pub use order_type::OrderType;
pub use position::Position;
pub use side::Side;
