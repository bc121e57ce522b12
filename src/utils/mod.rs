pub(crate) mod ellipsis;
pub(crate) mod fs;
pub(crate) mod keyed_lock;
pub(crate) mod log;
pub(crate) mod normalize;
#[cfg(test)]
pub(crate) mod testing;

use std::{future::Future, pin::Pin};

use futures::Stream;

pub(crate) use ellipsis::Ellipsis;
pub(crate) use keyed_lock::KeyedLocks;
pub(crate) use normalize::Normalize;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

