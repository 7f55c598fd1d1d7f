use std::fmt;

pub fn display_fn<F>(f: F) -> impl fmt::Display
where
    F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
{
    struct DisplayFn<F> {
        f: F,
    }
    impl<F> fmt::Display for DisplayFn<F>
    where
        F: Fn(&mut fmt::Formatter<'_>) -> fmt::Result,
    {
        fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            (self.f)(formatter)
        }
    }
    DisplayFn { f }
}

/// Resolve the unique names of a sequence of declared names.
///
/// Names declared once are kept verbatim, while names declared several
/// times get a `$1`, `$2`, ... suffix in declaration order. When
/// `rename_unique_empty` is set, a lone empty name becomes `$1`.
pub(crate) fn resolve_names<'a, I>(short_names: I, rename_unique_empty: bool) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: Clone,
{
    let short_names = short_names.into_iter();

    let mut counts = crate::types::Map::<&str, usize>::default();
    for name in short_names.clone() {
        *counts.entry(name).or_default() += 1;
    }

    let mut indices = crate::types::Map::<&str, usize>::default();
    short_names
        .map(|name| {
            if counts[name] == 1 {
                if name.is_empty() && rename_unique_empty {
                    "$1".to_owned()
                } else {
                    name.to_owned()
                }
            } else {
                let index = indices.entry(name).or_default();
                *index += 1;
                format!("{}${}", name, index)
            }
        })
        .collect()
}
