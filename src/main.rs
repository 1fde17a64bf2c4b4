use anyhow::Context;
use buwizz_controller::domain::control;
use buwizz_controller::domain::models::Port;
use buwizz_controller::domain::settings::{Settings, SettingsService};
use buwizz_controller::infrastructure::buwizz::transport::{RecordingTransport, Transport};
use buwizz_controller::infrastructure::buwizz::Buwizz3;
use buwizz_controller::infrastructure::logging::init_logger;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings_service = SettingsService::new()?;
    if !settings_service.path().exists() {
        settings_service
            .save()
            .context("Failed to write default settings")?;
    }
    let settings = settings_service.get().clone();

    let _logging_guard = init_logger(&settings.log_settings)?;
    info!("Starting BuWizz Controller");
    info!("Settings loaded from {}", settings_service.path().display());

    info!(
        "Target service {}, characteristic {}",
        settings.ble_service_uuid, settings.ble_application_char_uuid
    );

    // No radio here: frames are logged and recorded
    let mut device = Buwizz3::new(RecordingTransport::new());
    device.connect().await?;

    setup_session(&mut device, &settings)
        .await
        .context("Failed to configure ports")?;
    run_control_loop(&mut device, &settings).await?;

    for port in [Port::Port1, Port::Port2, Port::PortA, Port::PortB] {
        device.set_motor_velocity(port, 0.0).await?;
    }
    info!(
        "Session finished, {} frames written",
        device.transport().written().len()
    );

    if settings.hibernate_on_exit {
        device.activate_hibernation().await?;
    }
    device.disconnect().await?;

    Ok(())
}

async fn setup_session<T: Transport>(
    device: &mut Buwizz3<T>,
    settings: &Settings,
) -> anyhow::Result<()> {
    device
        .set_data_refresh_rate(settings.data_refresh_rate_ms)
        .await?;

    for setup in &settings.port_setup {
        info!(
            "{}: {} mode, reference {}",
            setup.port, setup.mode, setup.reference
        );
        device
            .set_powerup_motor_mode(setup.port, setup.mode, setup.reference)
            .await?;
    }

    for port in &settings.pid_status_ports {
        device
            .set_powerup_motor_pid_status_enable(*port, true)
            .await?;
    }

    Ok(())
}

async fn run_control_loop<T: Transport>(
    device: &mut Buwizz3<T>,
    settings: &Settings,
) -> anyhow::Result<()> {
    let period_ms = settings.control_period_ms.max(1);
    let mut ticker = tokio::time::interval(Duration::from_millis(period_ms));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    for tick in 0..settings.control_ticks {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping control loop");
                break;
            }
            _ = ticker.tick() => {}
        }

        match device.get_status() {
            Ok(Some(status)) => debug!("Status:\n{}", status),
            Ok(None) => trace!("No telemetry yet"),
            Err(e) => warn!("Dropping telemetry frame: {}", e),
        }

        let actions = control::sweep(tick, period_ms);
        for (port, velocity) in actions.velocities {
            device.set_motor_velocity(port, velocity).await?;
        }
        for (port, angle) in actions.angles {
            device.set_motor_angle(port, angle).await?;
        }
    }

    Ok(())
}
