use ash_context::{
    AshPlatform, BootstrapConfig, Context, Logger, QueueType, Severity, required_window_extensions,
};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId};

#[derive(Default)]
struct App {
    window: Option<Arc<Window>>,
    context: Option<Context<AshPlatform>>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let init = || -> anyhow::Result<(Arc<Window>, Context<AshPlatform>)> {
            let window = Arc::new(event_loop.create_window(WindowAttributes::default())?);
            let extensions = required_window_extensions(&window)?;

            let mut logger = Logger::new();
            logger.init(Severity::Debug, std::env::var_os("BOOTSTRAP_LOG"));

            let config = BootstrapConfig::default()
                .app_name("Example Vulkan Application")
                .engine_name("Example Vulkan Engine");
            let mut context = Context::with_logger(AshPlatform::load()?, config, logger);
            context.initialize(&extensions)?;

            let (graphics_family, _graphics_queue) = context.get_queue(QueueType::Graphics)?;
            println!("graphics queue family: {graphics_family}");

            Ok((window, context))
        };

        match init() {
            Ok((window, context)) => {
                self.window.replace(window);
                self.context.replace(context);
            }
            Err(err) => panic!("Could not initialize vulkan: {err:#}"),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let WindowEvent::CloseRequested = event {
            if let Some(mut context) = self.context.take() {
                context.teardown();
            }
            event_loop.exit();
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let event_loop = EventLoop::new()?;
    let mut app = App::default();
    event_loop.run_app(&mut app)?;

    Ok(())
}
