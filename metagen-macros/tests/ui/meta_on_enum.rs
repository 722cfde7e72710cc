#![allow(dead_code)]

use metagen_macros::Meta;

#[derive(Meta)]
pub enum Color {
    Red,
    Green,
}

fn main() {}
