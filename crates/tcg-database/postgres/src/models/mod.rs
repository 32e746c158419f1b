pub mod card;
pub mod card_price;

pub use card::{into_card_refs, Card, CardPricingUpdate};
pub use card_price::{CardPrice, PriceColumns};
