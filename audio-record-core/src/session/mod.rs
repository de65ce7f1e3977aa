pub(crate) mod capture_loop;
pub mod recorder;

#[cfg(test)]
mod test_support;
