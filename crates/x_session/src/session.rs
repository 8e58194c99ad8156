use std::cell::RefCell;
use std::env;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::xinput::{self, ConnectionExt as _, XIEventMask};
use x11rb::protocol::xproto::{
    ConnectionExt as _, CreateGCAux, CreateWindowAux, Cursor, EventMask, Rectangle, Window,
    WindowClass,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use crate::atoms::Atoms;
use crate::error::SessionError;
use crate::event::{InputChannel, SessionEvent};
use crate::wait;

/// Glyph index of the wristwatch in the core "cursor" font.
const XC_WATCH: u16 = 150;

/// XInput version we announce. The server only delivers raw events to a
/// client while another client holds a grab if the client announced 2.1 or
/// later.
const XI_REQUESTED: (u16, u16) = (2, 2);

/// True if the server's XInput version delivers raw events regardless of
/// grabs.
fn raw_events_bypass_grabs(major: u16, minor: u16) -> bool {
    (major, minor) >= (2, 1)
}

/// A connection to the X server plus the resources the daemon owns on it.
///
/// [`XSession::connect`] is enough for the control client. The daemon goes on
/// to call [`XSession::claim`], which creates its private window, cursors and
/// raw-input selection.
pub struct XSession {
    pub(crate) conn: RustConnection,
    pub(crate) root: Window,
    pub(crate) window: Window,
    pub(crate) atoms: Atoms,
    pub(crate) blank_cursor: Cursor,
    pub(crate) busy_cursor: Cursor,
    display_name: String,
    vendor: String,
    /// An event taken off the queue by [`XSession::has_pending_event`] and not
    /// yet handed out.
    peeked: RefCell<Option<Event>>,
}

impl XSession {
    /// Open the display and intern the protocol atoms.
    pub fn connect(display: Option<&str>) -> Result<Self, SessionError> {
        let display_name = display
            .map(String::from)
            .or_else(|| env::var("DISPLAY").ok())
            .unwrap_or_default();

        let (conn, screen_num) =
            x11rb::connect(display).map_err(|source| SessionError::Connect {
                display: display_name.clone(),
                source,
            })?;

        let setup = conn.setup();
        let root = setup.roots[screen_num].root;
        let vendor = String::from_utf8_lossy(&setup.vendor).into_owned();
        let atoms = Atoms::new(&conn)?.reply()?;

        Ok(Self {
            conn,
            root,
            window: x11rb::NONE,
            atoms,
            blank_cursor: x11rb::NONE,
            busy_cursor: x11rb::NONE,
            display_name,
            vendor,
            peeked: RefCell::new(None),
        })
    }

    /// Create the daemon's window and cursors and start listening for raw
    /// input. Fails if XInput2 is unavailable, since idle detection depends
    /// on raw events.
    pub fn claim(&mut self) -> Result<(), SessionError> {
        if self
            .conn
            .extension_information(xinput::X11_EXTENSION_NAME)?
            .is_none()
        {
            return Err(SessionError::MissingExtension("XInputExtension"));
        }
        let (major, minor) = XI_REQUESTED;
        let version = self.conn.xinput_xi_query_version(major, minor)?.reply()?;
        if !raw_events_bypass_grabs(version.major_version, version.minor_version) {
            return Err(SessionError::MissingExtension("XInputExtension 2.1"));
        }

        let window = self.conn.generate_id()?;
        self.conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            window,
            self.root,
            0,
            0,
            1,
            1,
            0,
            WindowClass::INPUT_ONLY,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new()
                .override_redirect(1)
                .event_mask(EventMask::PROPERTY_CHANGE),
        )?;
        self.window = window;

        self.blank_cursor = self.create_blank_cursor()?;
        self.busy_cursor = self.create_glyph_cursor(XC_WATCH)?;

        let mask = xinput::EventMask {
            deviceid: xinput::Device::ALL_MASTER.into(),
            mask: vec![(XIEventMask::RAW_KEY_PRESS
                | XIEventMask::RAW_BUTTON_PRESS
                | XIEventMask::RAW_MOTION)
                .into()],
        };
        self.conn.xinput_xi_select_events(self.root, &[mask])?;
        self.conn.flush()?;
        Ok(())
    }

    /// A 1x1 cursor whose mask is empty, so nothing is drawn.
    fn create_blank_cursor(&self) -> Result<Cursor, SessionError> {
        let pixmap = self.conn.generate_id()?;
        let gc = self.conn.generate_id()?;
        let cursor = self.conn.generate_id()?;
        self.conn.create_pixmap(1, pixmap, self.root, 1, 1)?;
        self.conn
            .create_gc(gc, pixmap, &CreateGCAux::new().foreground(0))?;
        self.conn.poly_fill_rectangle(
            pixmap,
            gc,
            &[Rectangle {
                x: 0,
                y: 0,
                width: 1,
                height: 1,
            }],
        )?;
        self.conn
            .create_cursor(cursor, pixmap, pixmap, 0, 0, 0, 0, 0, 0, 0, 0)?;
        self.conn.free_gc(gc)?;
        self.conn.free_pixmap(pixmap)?;
        Ok(cursor)
    }

    fn create_glyph_cursor(&self, glyph: u16) -> Result<Cursor, SessionError> {
        let font = self.conn.generate_id()?;
        let cursor = self.conn.generate_id()?;
        self.conn.open_font(font, b"cursor")?;
        self.conn.create_glyph_cursor(
            cursor,
            font,
            font,
            glyph,
            glyph + 1,
            0,
            0,
            0,
            0xffff,
            0xffff,
            0xffff,
        )?;
        self.conn.close_font(font)?;
        Ok(cursor)
    }

    pub fn atoms(&self) -> &Atoms {
        &self.atoms
    }

    /// The daemon's private window, or `x11rb::NONE` before [`claim`](Self::claim).
    pub fn window(&self) -> Window {
        self.window
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Vendor string from the connection setup, used to spot nested servers.
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Raw descriptor of the display connection. Children close it before
    /// exec so they cannot talk over our connection.
    pub fn fd(&self) -> RawFd {
        self.conn.stream().as_raw_fd()
    }

    pub fn flush(&self) -> Result<(), SessionError> {
        self.conn.flush()?;
        Ok(())
    }

    /// Block until the connection is readable or `timeout` elapses.
    ///
    /// Returns `Ok(false)` on timeout and also when a signal interrupted the
    /// wait, so the caller gets a chance to drain its signal flags.
    pub fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        wait::readable(self.fd(), timeout)
    }

    /// Next already-received event, without blocking.
    pub fn poll_event(&self) -> Result<Option<SessionEvent>, SessionError> {
        match self.poll_raw_event()? {
            Some(event) => Ok(Some(self.translate(event))),
            None => Ok(None),
        }
    }

    /// True if an event is already waiting, either on the socket or read
    /// off it during an earlier round trip. `select()` only sees the former,
    /// so check this before blocking.
    pub fn has_pending_event(&self) -> Result<bool, SessionError> {
        let mut peeked = self.peeked.borrow_mut();
        if peeked.is_none() {
            *peeked = self.conn.poll_for_event()?;
        }
        Ok(peeked.is_some())
    }

    pub(crate) fn poll_raw_event(&self) -> Result<Option<Event>, SessionError> {
        if let Some(event) = self.peeked.borrow_mut().take() {
            return Ok(Some(event));
        }
        Ok(self.conn.poll_for_event()?)
    }

    /// Where the pointer is on the root window.
    pub fn pointer_position(&self) -> Result<(i32, i32), SessionError> {
        let pointer = self.conn.query_pointer(self.root)?.reply()?;
        Ok((pointer.root_x.into(), pointer.root_y.into()))
    }

    fn translate(&self, event: Event) -> SessionEvent {
        match event {
            Event::KeyPress(_) => SessionEvent::Key(InputChannel::Grabbed),
            Event::ButtonPress(_) => SessionEvent::Button(InputChannel::Grabbed),
            Event::MotionNotify(motion) => SessionEvent::Motion {
                channel: InputChannel::Grabbed,
                root_x: motion.root_x.into(),
                root_y: motion.root_y.into(),
            },
            Event::XinputRawKeyPress(_) => SessionEvent::Key(InputChannel::Raw),
            Event::XinputRawButtonPress(_) => SessionEvent::Button(InputChannel::Raw),
            Event::XinputRawMotion(_) => SessionEvent::RawMotion,
            Event::ClientMessage(message)
                if message.type_ == self.atoms.screensaver && message.format == 32 =>
            {
                let data = message.data.as_data32();
                SessionEvent::Command {
                    window: message.window,
                    kind: data[0],
                    arg: data[1] as i32,
                }
            }
            Event::Error(error) => SessionEvent::ProtocolError {
                description: format!(
                    "{:?} in {} (bad value 0x{:x})",
                    error.error_kind,
                    error.request_name.unwrap_or("unknown request"),
                    error.bad_value
                ),
            },
            _ => SessionEvent::Other,
        }
    }
}
