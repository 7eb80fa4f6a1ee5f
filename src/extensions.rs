use std::fmt::Display;

pub trait ResultExtensions<T, E> {
    fn pure(item: T) -> Result<T, E> {
        Ok(item)
    }

    /// Reports an error as the interpreter's fatal banner on stdout and
    /// discards it.
    fn or_fatal(self) -> Option<T>;
}

impl<T, E: Display> ResultExtensions<T, E> for Result<T, E> {
    fn or_fatal(self) -> Option<T> {
        self.inspect_err(|err| println!("{}", fatal_banner(err)))
            .ok()
    }
}

pub fn fatal_banner(err: &impl Display) -> String {
    format!("FATAL INTERPRETER ERROR: {}", err)
}
