//! End-to-end runs of the pipeline against in-process fakes.

#[cfg(test)]
mod support;

mod discovery {
    mod integration;
}
