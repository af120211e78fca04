// Tilt Guard: Wi-Fi Station

use anyhow::anyhow;
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use tiltguard::config::{WIFI_PASSWORD, WIFI_SSID};

/// Join the configured network and block until DHCP has an address. The
/// returned handle must stay alive for the connection to persist.
pub fn connect(modem: Modem) -> anyhow::Result<BlockingWifi<EspWifi<'static>>> {
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sys_loop.clone(), Some(nvs))?, sys_loop)?;

    let auth_method = if WIFI_PASSWORD.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: WIFI_SSID.try_into().map_err(|_| anyhow!("SSID too long"))?,
        password: WIFI_PASSWORD.try_into().map_err(|_| anyhow!("Wi-Fi password too long"))?,
        auth_method,
        ..Default::default()
    }))?;

    wifi.start()?;
    log::info!("Wi-Fi started, connecting to {:?}", WIFI_SSID);
    wifi.connect()?;
    wifi.wait_netif_up()?;

    let ip = wifi.wifi().sta_netif().get_ip_info()?;
    log::info!("Wi-Fi up, address {}", ip.ip);
    Ok(wifi)
}
