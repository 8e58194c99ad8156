x11rb::atom_manager! {
    /// Every atom the daemon and the control client exchange.
    pub Atoms: AtomsCookie {
        screensaver: &b"SCREENSAVER"[..],
        screensaver_version: &b"_SCREENSAVER_VERSION"[..],
        screensaver_id: &b"_SCREENSAVER_ID"[..],
        screensaver_status: &b"_SCREENSAVER_STATUS"[..],
        screensaver_response: &b"_SCREENSAVER_RESPONSE"[..],
        activate: &b"ACTIVATE"[..],
        deactivate: &b"DEACTIVATE"[..],
        cycle: &b"CYCLE"[..],
        next: &b"NEXT"[..],
        prev: &b"PREV"[..],
        select: &b"SELECT"[..],
        lock: &b"LOCK"[..],
        blank: &b"BLANK"[..],
        suspend: &b"SUSPEND"[..],
        exit: &b"EXIT"[..],
        restart: &b"RESTART"[..],
        demo: &b"DEMO"[..],
    }
}
