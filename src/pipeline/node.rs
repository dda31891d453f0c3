//! Capability traits for the external collaborators of a pipeline run.
//!
//! The pipeline never opens files, decodes video or encrypts anything itself.
//! It pulls payloads from an [`ItemSource`], hands selected ones to a
//! [`Transform`], and pushes everything into an [`ItemSink`].

use crate::pipeline::error::BoxError;
use crate::pipeline::packet::Item;

/// Yields payloads one at a time.
pub trait ItemSource<P>: Send {
    /// Next payload, `Ok(None)` when exhausted, or `Err` on a read failure.
    ///
    /// Never called again after returning `Ok(None)` or `Err`.
    fn next_item(&mut self) -> Result<Option<P>, BoxError>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String {
        "source".to_string()
    }
}

/// Consumes items strictly in the order presented.
pub trait ItemSink<P>: Send {
    fn consume(&mut self, item: Item<P>) -> Result<(), BoxError>;

    /// Flush and close after the last item. Only called on a clean drain.
    fn finish(&mut self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Mutates a payload in place. Owns whatever state it needs between calls.
pub trait Transform<P>: Send {
    fn apply(&mut self, payload: &mut P);

    fn name(&self) -> &str {
        "transform"
    }
}

/// A [`Transform`] backed by a closure.
pub struct FnTransform<F> {
    name: &'static str,
    f: F,
}

/// Wrap a closure as a named transform.
pub fn transform_fn<P, F>(name: &'static str, f: F) -> FnTransform<F>
where
    F: FnMut(&mut P) + Send,
{
    FnTransform { name, f }
}

impl<P, F> Transform<P> for FnTransform<F>
where
    F: FnMut(&mut P) + Send,
{
    fn apply(&mut self, payload: &mut P) {
        (self.f)(payload)
    }

    fn name(&self) -> &str {
        self.name
    }
}

impl<P> Transform<P> for Box<dyn Transform<P>> {
    fn apply(&mut self, payload: &mut P) {
        (**self).apply(payload)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<P> ItemSource<P> for Box<dyn ItemSource<P>> {
    fn next_item(&mut self) -> Result<Option<P>, BoxError> {
        (**self).next_item()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

impl<P> ItemSink<P> for Box<dyn ItemSink<P>> {
    fn consume(&mut self, item: Item<P>) -> Result<(), BoxError> {
        (**self).consume(item)
    }

    fn finish(&mut self) -> Result<(), BoxError> {
        (**self).finish()
    }
}

/// Adapts any iterator into an infallible source.
pub struct IterSource<I> {
    iter: I,
}

impl<I> IterSource<I> {
    pub fn new(iter: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            iter: iter.into_iter(),
        }
    }
}

impl<I, P> ItemSource<P> for IterSource<I>
where
    I: Iterator<Item = P> + Send,
{
    fn next_item(&mut self) -> Result<Option<P>, BoxError> {
        Ok(self.iter.next())
    }

    fn describe(&self) -> String {
        "iterator".to_string()
    }
}

/// Collects every consumed item into a `Vec`.
#[derive(Debug)]
pub struct VecSink<P> {
    pub items: Vec<Item<P>>,
    pub finished: bool,
}

impl<P> VecSink<P> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            finished: false,
        }
    }
}

impl<P> Default for VecSink<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Send> ItemSink<P> for VecSink<P> {
    fn consume(&mut self, item: Item<P>) -> Result<(), BoxError> {
        self.items.push(item);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), BoxError> {
        self.finished = true;
        Ok(())
    }
}
