//! Structured requests: tuples, vectors, arrays and string maps of
//! dependencies resolved as one.
//!
//! Every member is resolved even after a sibling fails so the resulting
//! `PropertyFailed` error reports all failing members. When every member
//! produces synchronously the structure is ready immediately; otherwise the
//! pending members are awaited concurrently.

use std::collections::BTreeMap;

use futures::future::FutureExt;

use crate::container::dependency::Dependency;
use crate::container::flow::{join_all, Flow, Provider, Value};
use crate::container::resolver::Resolution;
use crate::errors::{DiError, Result};

fn member<T>(
    result: Result<T>,
    name: impl Into<String>,
    failures: &mut BTreeMap<String, DiError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            failures.insert(name.into(), error);
            None
        }
    }
}

impl Dependency for () {
    type Output = ();

    fn resolve(&self, _cx: &mut Resolution<'_>) -> Result<Provider<()>> {
        Ok(Provider::constant(()))
    }

    fn describe(&self) -> String {
        "()".to_string()
    }
}

macro_rules! tuple_dependency {
    ($($name:ident $index:tt),+) => {
        impl<$($name: Dependency),+> Dependency for ($($name,)+) {
            type Output = ($($name::Output,)+);

            #[allow(non_snake_case)]
            fn resolve(&self, cx: &mut Resolution<'_>) -> Result<Provider<Self::Output>> {
                let mut failures = BTreeMap::new();
                $(
                    let $name = member(self.$index.resolve(cx), stringify!($index), &mut failures);
                )+
                let ($(Some($name),)+) = ($($name,)+) else {
                    return Err(DiError::PropertyFailed { failures });
                };

                Ok(Provider::new(move || {
                    $(
                        let $name = $name.flow();
                    )+
                    match ($($name,)+) {
                        ($(Flow::Ready($name),)+) => Flow::Ready(($($name,)+)),
                        ($($name,)+) => Flow::Pending(
                            async move { futures::join!($($name.into_future()),+) }.boxed(),
                        ),
                    }
                }))
            }

            fn describe(&self) -> String {
                let members: Vec<String> = vec![$(self.$index.describe()),+];
                format!("({})", members.join(", "))
            }
        }
    };
}

tuple_dependency!(A 0);
tuple_dependency!(A 0, B 1);
tuple_dependency!(A 0, B 1, C 2);
tuple_dependency!(A 0, B 1, C 2, D 3);
tuple_dependency!(A 0, B 1, C 2, D 3, E 4);
tuple_dependency!(A 0, B 1, C 2, D 3, E 4, F 5);
tuple_dependency!(A 0, B 1, C 2, D 3, E 4, F 5, G 6);
tuple_dependency!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);

fn resolve_members<'d, D, I>(members: I, cx: &mut Resolution<'_>) -> Result<Vec<Provider<D::Output>>>
where
    D: Dependency + 'd,
    I: IntoIterator<Item = (String, &'d D)>,
{
    let mut failures = BTreeMap::new();
    let mut providers = Vec::new();
    for (name, dependency) in members {
        if let Some(provider) = member(dependency.resolve(cx), name, &mut failures) {
            providers.push(provider);
        }
    }

    if failures.is_empty() {
        Ok(providers)
    } else {
        Err(DiError::PropertyFailed { failures })
    }
}

fn join_providers<T: Value>(providers: &[Provider<T>]) -> Flow<Vec<T>> {
    join_all(providers.iter().map(Provider::flow).collect())
}

impl<D: Dependency> Dependency for Vec<D> {
    type Output = Vec<D::Output>;

    fn resolve(&self, cx: &mut Resolution<'_>) -> Result<Provider<Self::Output>> {
        let named = self.iter().enumerate().map(|(index, d)| (index.to_string(), d));
        let providers = resolve_members(named, cx)?;
        Ok(Provider::new(move || join_providers(&providers)))
    }

    fn describe(&self) -> String {
        let members: Vec<String> = self.iter().map(Dependency::describe).collect();
        format!("[{}]", members.join(", "))
    }
}

impl<D: Dependency, const N: usize> Dependency for [D; N] {
    type Output = [D::Output; N];

    fn resolve(&self, cx: &mut Resolution<'_>) -> Result<Provider<Self::Output>> {
        let named = self.iter().enumerate().map(|(index, d)| (index.to_string(), d));
        let providers = resolve_members(named, cx)?;
        Ok(Provider::new(move || {
            join_providers(&providers).map(|values| match values.try_into() {
                Ok(array) => array,
                Err(_) => unreachable!("one value is produced per array member"),
            })
        }))
    }

    fn describe(&self) -> String {
        let members: Vec<String> = self.iter().map(Dependency::describe).collect();
        format!("[{}]", members.join(", "))
    }
}

impl<D: Dependency> Dependency for BTreeMap<String, D> {
    type Output = BTreeMap<String, D::Output>;

    fn resolve(&self, cx: &mut Resolution<'_>) -> Result<Provider<Self::Output>> {
        let names: Vec<String> = self.keys().cloned().collect();
        let named = self.iter().map(|(name, d)| (name.clone(), d));
        let providers = resolve_members(named, cx)?;
        Ok(Provider::new(move || {
            let names = names.clone();
            join_providers(&providers).map(move |values| names.into_iter().zip(values).collect())
        }))
    }

    fn describe(&self) -> String {
        let members: Vec<String> = self
            .iter()
            .map(|(name, d)| format!("{}: {}", name, d.describe()))
            .collect();
        format!("{{{}}}", members.join(", "))
    }
}
