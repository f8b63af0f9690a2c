//! The injected model invocation.

use std::error::Error as StdError;
use std::future::Future;

use async_trait::async_trait;

/// A single-shot text model: prompt in, completion out.
///
/// Transport, auth and cancellation live entirely behind this trait.
/// Any `Fn(String) -> impl Future<Output = Result<String, E>>` closure is a
/// `LanguageModel`, so adapters can be passed inline:
///
/// ```
/// use promptfit_core::extraction::LanguageModel;
///
/// # async fn example() -> Result<(), std::io::Error> {
/// let model = |prompt: String| async move {
///     Ok::<_, std::io::Error>(format!("echo: {}", prompt.len()))
/// };
/// let reply = model.invoke("hi").await?;
/// assert_eq!(reply, "echo: 2");
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Error produced by the invocation.
    type Error: StdError + Send + Sync + 'static;

    /// Sends `prompt` to the model and returns its complete reply.
    async fn invoke(&self, prompt: &str) -> Result<String, Self::Error>;
}

#[async_trait]
impl<F, Fut, E> LanguageModel for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, E>> + Send,
    E: StdError + Send + Sync + 'static,
{
    type Error = E;

    async fn invoke(&self, prompt: &str) -> Result<String, E> {
        (self)(prompt.to_owned()).await
    }
}
