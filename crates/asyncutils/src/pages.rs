use futures::stream::FusedStream;
use futures::{Stream, TryStream, ready};
use pin_project_lite::pin_project;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// Groups the `Ok` items of a fallible stream into pages of a fixed size.
    ///
    /// Created by [`PagesExt::pages()`]. Every page holds exactly `size`
    /// items except the last, which holds whatever is left over; an empty
    /// input produces no pages at all.
    ///
    /// The first `Err` ends the stream: the partially filled page is
    /// discarded, the error is yielded, and the inner stream is never polled
    /// again. Once finished (by error or by exhaustion) the adapter keeps
    /// returning `None`.
    #[must_use = "streams do nothing unless polled"]
    pub struct Pages<S, T> {
        #[pin]
        inner: S,
        size: NonZeroUsize,
        page: Vec<T>,
        exhausted: bool,
    }
}

impl<S, T> Pages<S, T> {
    pub fn page_size(&self) -> NonZeroUsize {
        self.size
    }
}

impl<S, T, E> Stream for Pages<S, T>
where
    S: Stream<Item = Result<T, E>>,
{
    type Item = Result<Vec<T>, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        if *this.exhausted {
            return Poll::Ready(None);
        }
        loop {
            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(item)) => {
                    this.page.push(item);
                    if this.page.len() >= this.size.get() {
                        let full = std::mem::replace(this.page, Vec::with_capacity(this.size.get()));
                        return Poll::Ready(Some(Ok(full)));
                    }
                },
                Some(Err(err)) => {
                    *this.exhausted = true;
                    this.page.clear();
                    return Poll::Ready(Some(Err(err)));
                },
                None => {
                    *this.exhausted = true;
                    if this.page.is_empty() {
                        return Poll::Ready(None);
                    }
                    return Poll::Ready(Some(Ok(std::mem::take(this.page))));
                },
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.exhausted {
            return (0, Some(0));
        }
        let (_, upper) = self.inner.size_hint();
        let buffered = self.page.len();
        (0, upper.map(|upper| (upper + buffered).div_ceil(self.size.get()) + 1))
    }
}

impl<S, T, E> FusedStream for Pages<S, T>
where
    S: Stream<Item = Result<T, E>>,
{
    fn is_terminated(&self) -> bool {
        self.exhausted
    }
}

/// Extension trait adding [`pages()`](PagesExt::pages) to fallible streams.
pub trait PagesExt: TryStream + Sized {
    /// Group `Ok` items into pages of `size`. See [`Pages`].
    ///
    /// # Examples
    ///
    /// ```
    /// use filecat_asyncutils::PagesExt;
    /// use futures::{StreamExt, stream};
    /// use std::num::NonZeroUsize;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let items = stream::iter((1..=5).map(Ok::<_, ()>));
    /// let pages: Vec<_> = items.pages(NonZeroUsize::new(2).unwrap()).collect().await;
    /// assert_eq!(pages, [Ok(vec![1, 2]), Ok(vec![3, 4]), Ok(vec![5])]);
    /// # }
    /// ```
    fn pages(self, size: NonZeroUsize) -> Pages<Self, Self::Ok> {
        Pages {
            inner: self,
            size,
            page: Vec::with_capacity(size.get()),
            exhausted: false,
        }
    }
}

impl<S: TryStream> PagesExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{StreamExt, stream};
    use rstest::rstest;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[rstest]
    #[case(5, 2, vec![2, 2, 1])]
    #[case(4, 2, vec![2, 2])]
    #[case(1, 100, vec![1])]
    #[case(0, 3, vec![])]
    #[case(3, 1, vec![1, 1, 1])]
    #[tokio::test]
    async fn test_page_sizes(#[case] items: usize, #[case] page: usize, #[case] expected: Vec<usize>) {
        let pages: Vec<_> = stream::iter((0..items).map(Ok::<_, ()>)).pages(size(page)).collect().await;
        let sizes: Vec<_> = pages.into_iter().map(|p| p.unwrap().len()).collect();
        assert_eq!(sizes, expected);
    }

    #[tokio::test]
    async fn test_order_preserved() {
        let pages: Vec<_> = stream::iter(["e", "d", "c", "b", "a"].map(Ok::<_, ()>)).pages(size(2)).collect().await;
        assert_eq!(pages, [Ok(vec!["e", "d"]), Ok(vec!["c", "b"]), Ok(vec!["a"])]);
    }

    #[tokio::test]
    async fn test_error_terminates() {
        let items = stream::iter([Ok(1), Ok(2), Ok(3), Err("boom"), Ok(4), Ok(5)]);
        let mut pages = items.pages(size(2));
        assert_eq!(pages.next().await, Some(Ok(vec![1, 2])));
        // The partial page [3] is dropped with the error
        assert_eq!(pages.next().await, Some(Err("boom")));
        assert!(pages.is_terminated());
        assert_eq!(pages.next().await, None);
        assert_eq!(pages.next().await, None);
    }

    #[tokio::test]
    async fn test_not_restartable() {
        let mut pages = stream::iter([Ok::<_, ()>(1)]).pages(size(2));
        assert!(!pages.is_terminated());
        assert_eq!(pages.next().await, Some(Ok(vec![1])));
        assert_eq!(pages.next().await, None);
        assert!(pages.is_terminated());
        assert_eq!(pages.next().await, None);
    }
}
