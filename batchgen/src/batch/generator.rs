use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;

use crate::text::Segment;

/// The slow, fallible step a batch drives each segment through.
///
/// Implementations own any timeout policy; the orchestrator never aborts a
/// call in flight.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Opaque result of one successful call (image bytes, audio, text...)
    type Artifact: Send;

    /// Produce the artifact for one segment.
    async fn generate(&self, segment: &Segment) -> anyhow::Result<Self::Artifact>;

    /// Name for log lines.
    fn name(&self) -> &str {
        "generator"
    }
}

/// Generator backed by an async closure.
pub struct FnGenerator<F, Fut, A> {
    f: F,
    _marker: PhantomData<fn() -> (Fut, A)>,
}

/// Adapt `Fn(Segment) -> Future<Output = anyhow::Result<A>>` into a [`Generator`].
pub fn generator_fn<F, Fut, A>(f: F) -> FnGenerator<F, Fut, A>
where
    F: Fn(Segment) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<A>> + Send + 'static,
    A: Send + 'static,
{
    FnGenerator {
        f,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<F, Fut, A> Generator for FnGenerator<F, Fut, A>
where
    F: Fn(Segment) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<A>> + Send + 'static,
    A: Send + 'static,
{
    type Artifact = A;

    async fn generate(&self, segment: &Segment) -> anyhow::Result<A> {
        (self.f)(segment.clone()).await
    }

    fn name(&self) -> &str {
        "closure"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generator_fn() {
        let generator = generator_fn(|segment: Segment| async move {
            if segment.text.is_empty() {
                anyhow::bail!("empty segment");
            }
            Ok(segment.text.to_uppercase())
        });

        let out = generator.generate(&Segment::new(0, "scene")).await.unwrap();
        assert_eq!(out, "SCENE");
        assert!(generator.generate(&Segment::new(1, "")).await.is_err());
        assert_eq!(generator.name(), "closure");
    }
}
