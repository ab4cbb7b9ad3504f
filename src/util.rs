use std::fmt;

/// Wrap a formatting closure into a value usable with `{}`.
///
/// The grammar-aware `display(g)` methods throughout the crate build on
/// this, so a type can borrow the grammar for the duration of one
/// formatting call without owning a renderer.
pub fn display_fn<F>(f: F) -> impl fmt::Display
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    struct DisplayFn<F>(F);

    impl<F> fmt::Display for DisplayFn<F>
    where
        F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
    {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            (self.0)(f)
        }
    }

    DisplayFn(f)
}
