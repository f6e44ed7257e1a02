use log::error;
use std::panic;

/// Install the process panic hook.
///
/// Debug builds get full `better_panic` backtraces, release builds the
/// `human_panic` crash report. Either way the panic is logged first.
pub fn initialize_panic_handler() {
    #[cfg(debug_assertions)]
    better_panic::install();

    #[cfg(not(debug_assertions))]
    human_panic::setup_panic!();

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        error!("{panic_info}");
        default_hook(panic_info);
    }));
}
