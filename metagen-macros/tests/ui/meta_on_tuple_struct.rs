#![allow(dead_code)]

use metagen_macros::Meta;

#[derive(Meta)]
pub struct Pair(i32, i32);

fn main() {}
