use std::{
    fmt, io,
    rc::Rc,
    sync::{Arc, Mutex},
};

use log::{debug, log, Level};

use crate::{sprintln, Message, Outcome, SharedError, Value};

/// A callback run for its side effects whenever an error occurs.
///
/// A handler receives the error and the message the failing call site passed, unrendered, so
/// that each handler can format it however it likes. Handlers cannot change the error or stop
/// other handlers from running.
pub type Handler = Box<dyn Fn(&SharedError, &Message)>;

/// An ordered set of [`Handler`]s.
///
/// ```
/// # use std::{cell::RefCell, rc::Rc};
/// # use may::{msg, Handlers};
/// let seen = Rc::new(RefCell::new(vec![]));
///
/// let mut handlers = Handlers::new();
/// let sink = seen.clone();
/// handlers.register(move |err, m| sink.borrow_mut().push(format!("{}: {err}", m.render())));
///
/// handlers.dispatch((), &msg!("nothing happened"));
/// handlers.dispatch(false, &msg!("step %d", 2));
///
/// assert_eq!(*seen.borrow(), ["step 2: not ok"]);
/// ```
#[derive(Default)]
pub struct Handlers {
    handlers: Vec<Handler>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handler, to run after every handler registered before it.
    pub fn register(&mut self, handler: impl Fn(&SharedError, &Message) + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Builder-style [`register`](Handlers::register).
    #[must_use]
    pub fn with(mut self, handler: impl Fn(&SharedError, &Message) + 'static) -> Self {
        self.register(handler);
        self
    }

    /// Runs every handler, in registration order, if `outcome` represents an error.
    ///
    /// Each handler gets the normalized error and the same `message`. If `outcome` is not an
    /// error, no handler runs.
    pub fn dispatch(&self, outcome: impl Into<Outcome>, message: &Message) {
        let Some(error) = outcome.into().into_error() else {
            return;
        };

        debug!(target: "may", "dispatching error to {} handler(s): {error}", self.handlers.len());
        for handler in &self.handlers {
            handler(&error, message);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl From<Vec<Handler>> for Handlers {
    fn from(handlers: Vec<Handler>) -> Self {
        Self { handlers }
    }
}

impl FromIterator<Handler> for Handlers {
    fn from_iter<I: IntoIterator<Item = Handler>>(iter: I) -> Self {
        Self { handlers: iter.into_iter().collect() }
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers").field("len", &self.handlers.len()).finish()
    }
}

/// Something which writes formatted lines somewhere.
pub trait Logger {
    /// Writes the formatted text. Line endings are part of `args`.
    fn printf(&self, args: fmt::Arguments<'_>);
}

impl<L: Logger + ?Sized> Logger for &L {
    fn printf(&self, args: fmt::Arguments<'_>) {
        (**self).printf(args)
    }
}

impl<L: Logger + ?Sized> Logger for Rc<L> {
    fn printf(&self, args: fmt::Arguments<'_>) {
        (**self).printf(args)
    }
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn printf(&self, args: fmt::Arguments<'_>) {
        (**self).printf(args)
    }
}

/// Writes to the wrapped writer. Write failures are dropped, since a handler has nowhere to
/// report them.
impl<W: io::Write> Logger for Mutex<W> {
    fn printf(&self, args: fmt::Arguments<'_>) {
        if let Ok(mut writer) = self.lock() {
            let _ = io::Write::write_fmt(&mut *writer, args);
        }
    }
}

/// A [`Logger`] which forwards lines to the [`log`] facade.
///
/// Lines are logged at [`Level::Error`] under the `may` target unless configured otherwise.
///
/// ```
/// # use may::{logger_handler, LogLogger};
/// let handler = logger_handler(LogLogger::new().level(log::Level::Warn).target("app::import"));
/// ```
#[derive(Debug, Clone)]
pub struct LogLogger {
    level: Level,
    target: String,
}

impl LogLogger {
    pub fn new() -> Self {
        Self { level: Level::Error, target: "may".to_owned() }
    }

    #[must_use]
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }
}

impl Default for LogLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger for LogLogger {
    fn printf(&self, args: fmt::Arguments<'_>) {
        let line = args.to_string();
        log!(target: self.target.as_str(), self.level, "{}", line.trim_end_matches('\n'));
    }
}

/// Creates a handler which writes each error as one line to `logger`.
///
/// The line is `"{message}: {error}"`, or just the error when the message renders empty,
/// followed by a newline.
///
/// ```
/// # use std::sync::{Arc, Mutex};
/// # use may::{logger_handler, msg, shared};
/// let out = Arc::new(Mutex::new(Vec::<u8>::new()));
/// let handler = logger_handler(out.clone());
///
/// handler(&shared("disk full"), &msg!("error occurred: %s", "foo"));
/// handler(&shared("disk full"), &msg!());
///
/// let written = String::from_utf8(out.lock().unwrap().clone()).unwrap();
/// assert_eq!(written, "error occurred: foo: disk full\ndisk full\n");
/// ```
pub fn logger_handler<L: Logger + 'static>(logger: L) -> Handler {
    Box::new(move |error: &SharedError, message: &Message| {
        let message = message.render();
        if message.is_empty() {
            logger.printf(format_args!("{error}\n"));
        } else {
            logger.printf(format_args!("{message}: {error}\n"));
        }
    })
}

/// Creates a handler which passes each error to a plain "print these values" function.
///
/// The function gets the rendered message with a trailing `:` and then the error as separate
/// values (or only the error, when the message renders empty), and is expected to join and
/// terminate them itself. [`sprintln`] is the conventional joining.
///
/// ```
/// # use std::{cell::RefCell, rc::Rc};
/// # use may::{log_func_handler, msg, shared, sprintln};
/// let out = Rc::new(RefCell::new(String::new()));
/// let sink = out.clone();
/// let handler = log_func_handler(move |values| sink.borrow_mut().push_str(&sprintln(values)));
///
/// handler(&shared("disk full"), &msg!("error occurred: %s", "foo"));
/// assert_eq!(*out.borrow(), "error occurred: foo: disk full\n");
/// ```
pub fn log_func_handler<P: Fn(&[Value]) + 'static>(print: P) -> Handler {
    Box::new(move |error: &SharedError, message: &Message| {
        let message = message.render();
        let error = Value::Error(error.clone());
        if message.is_empty() {
            print(&[error]);
        } else {
            print(&[Value::Str(format!("{message}:")), error]);
        }
    })
}

/// A [`log_func_handler`] which prints to standard error.
pub fn stderr_handler() -> Handler {
    log_func_handler(|values| eprint!("{}", sprintln(values)))
}
