#![no_main]
#![no_std]

use core::sync::atomic::{AtomicUsize, Ordering};

use defmt_rtt as _; // global logger
use duet_firmware::clock::Instant;
use duet_firmware::config::{BAUD_RATE, N_DIGITAL_HW_KEYS, N_KEYS};
use duet_firmware::controller::Controller;
use duet_firmware::hid_queue::HidOutput;
use duet_firmware::key::Key;
use duet_firmware::led::{self, LedInputs};
use duet_firmware::link::{Framer, LinkStatus};
use duet_firmware::scanner::{self, AnalogScanner, BoardKind, DigitalScanner};
use duet_firmware::usb_role;
use hal::gpio::{EPin, Analog, Input, Output, PushPull};
use hal::otg_fs::{UsbBusType, USB};
use hal::prelude::*;
use hal::serial;
use nb::block;
use panic_probe as _;
use stm32f4xx_hal as hal;
use usb_device::bus::UsbBusAllocator;
use usb_device::prelude::*;
use usbd_hid::descriptor::generator_prelude::*;
use usbd_hid::descriptor::{KeyboardReport, MouseReport as UsbMouseReport};
use usbd_hid::hid_class::HIDClass;

/// USB VID for a generic keyboard from
/// https://github.com/obdev/v-usb/blob/master/usbdrv/USB-IDs-for-free.txt
const VID: u16 = 0x16c0;

/// USB PID for a generic keyboard from
/// https://github.com/obdev/v-usb/blob/master/usbdrv/USB-IDs-for-free.txt
const PID: u16 = 0x27db;

// same panicking *behavior* as `panic-probe` but doesn't print a panic message
// this prevents the panic message being printed *twice* when `defmt::panic` is invoked
#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}

static COUNT: AtomicUsize = AtomicUsize::new(0);
defmt::timestamp!("{=usize}", {
    // NOTE(no-CAS) `timestamps` runs with interrupts disabled
    let n = COUNT.load(Ordering::Relaxed);
    COUNT.store(n + 1, Ordering::Relaxed);
    n
});

/// Halts after logging, blinking nothing (no on-board LED to drive here,
/// unlike the source's bare microcontroller which has none either): a
/// stand-in for the source giving up and looping forever on an
/// unrecoverable hardware fault (e.g. `localReader_discoverTypeSideAndVersion`
/// failing to identify a board).
fn fatal(msg: &str) -> ! {
    defmt::error!("fatal: {=str}", msg);
    loop {
        cortex_m::asm::bkpt();
    }
}

/// Reads the monotonic microsecond counter off a free-running hardware
/// timer, nudging a zero reading to 1. Mirrors `update_now`.
fn now_from_counter(counter: u32) -> Instant {
    Instant::from_micros(counter)
}

#[cortex_m_rt::entry]
fn main() -> ! {
    defmt::info!("init");

    let dp = hal::pac::Peripherals::take().unwrap();
    let clocks = dp
        .RCC
        .constrain()
        .cfgr
        .use_hse(25.MHz())
        .sysclk(84.MHz())
        .require_pll48clk()
        .freeze();

    let gpioa = dp.GPIOA.split();
    let gpiob = dp.GPIOB.split();

    // free-running microsecond counter used for the whole firmware's
    // cooperative scheduling (`Instant`/`Timer` in `clock.rs`)
    let mut micros = dp.TIM5.counter_us(&clocks);
    micros.start(u32::MAX.micros()).unwrap();

    // --- hardware revision/side autodetection, ported from
    // `readKeyboardVersion`/`localReader_discoverTypeSideAndVersion` ---
    // NOTE: the actual resistor/jumper probing (`detect_resistor`,
    // `detect_connection`) is intentionally left as a board-specific
    // extension point; on STM32F401 the relevant pins differ from the
    // RP2040 pin numbers the probes were tuned for. `board_kind` here is
    // picked at compile time via the `analog`/`digital`/`right_half`
    // Cargo features instead, which this port exposes for exactly that
    // reason.
    let board_kind = if cfg!(feature = "digital") {
        if cfg!(feature = "right_half") {
            BoardKind::RightDigital
        } else {
            BoardKind::LeftDigital
        }
    } else if cfg!(feature = "right_half") {
        BoardKind::RightAnalog
    } else {
        BoardKind::LeftAnalog
    };
    let my_side = board_kind.side();
    defmt::info!("board kind: {}, side: {}", board_kind, my_side);

    // --- USB bring-up ---
    static mut EP_MEMORY: [u32; 1024] = [0; 1024];
    static mut USB_BUS: Option<UsbBusAllocator<UsbBusType>> = None;

    let usb = USB {
        usb_global: dp.OTG_FS_GLOBAL,
        usb_device: dp.OTG_FS_DEVICE,
        usb_pwrclk: dp.OTG_FS_PWRCLK,
        pin_dm: gpioa.pa11.into_alternate().into(),
        pin_dp: gpioa.pa12.into_alternate().into(),
        hclk: clocks.hclk(),
    };
    unsafe {
        USB_BUS = Some(UsbBusType::new(usb, &mut EP_MEMORY));
    }
    let usb_bus = unsafe { USB_BUS.as_ref().unwrap() };

    let mut keyboard_hid = HIDClass::new(usb_bus, KeyboardReport::desc(), 1);
    let mut mouse_hid = HIDClass::new(usb_bus, UsbMouseReport::desc(), 1);
    let mut usb_dev = UsbDeviceBuilder::new(usb_bus, UsbVidPid(VID, PID))
        .manufacturer("Dario Götz")
        .product("Dario Götz's split keyboard")
        .serial_number(env!("CARGO_PKG_VERSION"))
        .composite_with_iads()
        .build();

    // --- inter-half UART link ---
    let (pb6, pb7) = (gpiob.pb6, gpiob.pb7);
    let serial_pins = cortex_m::interrupt::free(move |_cs| (pb6.into_alternate::<7>(), pb7.into_alternate::<7>()));
    let serial = dp
        .USART1
        .serial(serial_pins, serial::config::Config::default().baudrate(BAUD_RATE.bps()), &clocks)
        .unwrap();
    let (mut serial_tx, mut serial_rx) = serial.split();

    // --- key sensing hardware ---
    let mut keys: [Key; N_KEYS] = core::array::from_fn(|id| {
        if board_kind.is_analog() {
            Key::new_analog(id as u8, scanner::ANALOG_MIN_RAW_RANGE)
        } else {
            Key::new_digital(id as u8)
        }
    });

    let mut analog_scanner: Option<AnalogScanner<EPin<Output<PushPull>>, EPin<Analog>, hal::adc::Adc<hal::pac::ADC1>>> = None;
    let mut digital_scanner: Option<DigitalScanner<EPin<Input>>> = None;
    let mut adc = None;

    if board_kind.is_analog() {
        let sel_pins = [
            gpiob.pb14.into_push_pull_output().erase(),
            gpiob.pb15.into_push_pull_output().erase(),
            gpioa.pa3.into_push_pull_output().erase(),
            gpioa.pa1.into_push_pull_output().erase(),
            gpioa.pa0.into_push_pull_output().erase(),
        ];
        let ana_pins = [
            gpioa.pa4.into_analog().erase(),
            gpioa.pa5.into_analog().erase(),
            gpioa.pa6.into_analog().erase(),
            gpioa.pa7.into_analog().erase(),
        ];
        adc = Some(hal::adc::Adc::adc1(dp.ADC1, true, Default::default()));
        analog_scanner = Some(AnalogScanner::new(sel_pins, ana_pins, board_kind.hw_id_to_key_id()));
    } else {
        let pins: [Option<EPin<Input>>; N_DIGITAL_HW_KEYS] = core::array::from_fn(|_| None);
        digital_scanner = Some(DigitalScanner::new(pins, board_kind.hw_id_to_key_id()));
    }

    let mut controller = Controller::new();
    let mut hid = HidOutput::new();
    let mut link_status = LinkStatus::new(my_side, Instant::ZERO);
    let mut framer = Framer::new();

    loop {
        let now = now_from_counter(micros.now().ticks());

        // --- drain the inter-half link's receive side ---
        // a relayed key value from the peer is applied to the local `Key`
        // array exactly as if it had been locally scanned, same as
        // `comm_task` calling `key_setVal` directly; this runs before the
        // scan/edge-notify pass below so the value reaches this tick's
        // `Controller::task`/`notify_key_edge`, not next tick's.
        while let Ok(b) = serial_rx.read() {
            match framer.push_byte(b) {
                Ok(Some((key_id, val))) => {
                    if !link_status.receive(now, key_id, val) {
                        if let Some(key) = keys.iter_mut().find(|k| k.id() == key_id) {
                            key.set_remote_val(val as i8);
                        }
                    }
                }
                Ok(None) => {}
                Err(_) => defmt::warn!("dropped a malformed link frame"),
            }
        }
        link_status.poll_watchdog(now);

        // --- scan local keys ---
        if let (Some(scanner), Some(adc)) = (analog_scanner.as_mut(), adc.as_mut()) {
            if scanner.read(adc, &mut keys).is_err() {
                fatal("analog scan failed");
            }
        }
        if let Some(scanner) = digital_scanner.as_mut() {
            if scanner.read(now, &mut keys).is_err() {
                fatal("digital scan failed");
            }
        }

        // the USB-active half runs the controller on the union of its own
        // keys and the peer's relayed keys; the USB-passive half only
        // scans and forwards its own keys over the link, mirroring
        // `controller_task` (called only when `status.usbActive`) versus
        // `Key_sendChangedKeys(status.mySide)` (called only when passive).
        let is_host = link_status.usb_active;
        if is_host {
            for key in keys.iter_mut() {
                key.take_val_changed();
                if let Some(pressed) = key.take_press_changed() {
                    controller.notify_key_edge(now, key.id(), pressed, &mut hid);
                }
            }
            controller.task(now, &keys, &mut hid);
        } else {
            for key in keys.iter_mut() {
                key.take_press_changed();
                if key.side() != my_side {
                    key.take_val_changed();
                    continue;
                }
                if let Some(val) = key.take_val_changed().then(|| key.val()) {
                    let frame = duet_firmware::link::encode_key_value(key.id(), val as u8);
                    for &b in &frame {
                        let _ = block!(serial_tx.write(b));
                    }
                }
            }
        }

        // --- USB role arbitration and status beacon ---
        let send_due = link_status.should_send(now);
        if usb_role::decide(&mut link_status, now, send_due) {
            for &b in &link_status.status_frame() {
                let _ = block!(serial_tx.write(b));
            }
            link_status.mark_sent(now);
        }

        if link_status.usb_active {
            if let Some(report) = hid.pump() {
                let bytes: KeyboardReport = KeyboardReport {
                    modifier: report.modifiers.0,
                    reserved: 0,
                    leds: 0,
                    keycodes: report.keycodes.map(|k| k.0),
                };
                let _ = keyboard_hid.push_input(&bytes);
            }
            if let Some(mouse) = hid.take_mouse_report() {
                let bytes = UsbMouseReport {
                    buttons: mouse.buttons.0,
                    x: mouse.h,
                    y: mouse.v,
                    wheel: mouse.wv,
                    pan: mouse.wh,
                };
                let _ = mouse_hid.push_input(&bytes);
            }
        }

        if controller.take_reset_requested() {
            cortex_m::peripheral::SCB::sys_reset();
        }
        if controller.take_usb_side_toggle_requested() {
            link_status.toggle_usb = true;
        }

        let _ = led::color_for(LedInputs {
            usb_active: link_status.usb_active,
            other_side_usb_active: link_status.other_usb_active,
            caps_lock: controller.caps_locked(),
            word_lock: controller.word_locked(),
        });

        if usb_dev.poll(&mut [&mut keyboard_hid, &mut mouse_hid]) {
            // the host's single LED set-report: bit 0 is CapsLock
            let mut led_report = [0u8; 1];
            if keyboard_hid.pull_raw_output(&mut led_report).is_ok() {
                controller.set_caps_lock(led_report[0] & 0b0000_0001 != 0);
            }
        }
    }
}
