mod hass;
