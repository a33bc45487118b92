use poise::Command;

use crate::bot::Data;

pub mod golive;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub use golive::GoLiveCog;

pub trait Cog {
    fn commands(&self) -> Vec<Command<Data, Error>>;
}

pub struct Cogs;

impl Cog for Cogs {
    fn commands(&self) -> Vec<Command<Data, Error>> {
        GoLiveCog.commands()
    }
}
