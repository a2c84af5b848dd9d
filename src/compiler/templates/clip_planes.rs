pub(super) const VERTEX_DECLARATION: &str = r#"uniform vec4 vClipPlane;
uniform vec4 vClipPlane2;
uniform vec4 vClipPlane3;
uniform vec4 vClipPlane4;
uniform vec4 vClipPlane5;
uniform vec4 vClipPlane6;
float computeClipDistance(vec4 clipPosition, vec4 clipPlane) {
    return dot(clipPosition, clipPlane);
}
"#;

pub(super) const VERTEX: &str = r#"#ifdef CLIPPLANE
fClipDistance = computeClipDistance(worldPos, vClipPlane);
#endif
#ifdef CLIPPLANE2
fClipDistance2 = computeClipDistance(worldPos, vClipPlane2);
#endif
#ifdef CLIPPLANE3
fClipDistance3 = computeClipDistance(worldPos, vClipPlane3);
#endif
#ifdef CLIPPLANE4
fClipDistance4 = computeClipDistance(worldPos, vClipPlane4);
#endif
#ifdef CLIPPLANE5
fClipDistance5 = computeClipDistance(worldPos, vClipPlane5);
#endif
#ifdef CLIPPLANE6
fClipDistance6 = computeClipDistance(worldPos, vClipPlane6);
#endif
"#;

pub(super) const FRAGMENT_DECLARATION: &str = r#"bool isClipped(float clipDistance) {
    return clipDistance > 0.0;
}
"#;

pub(super) const FRAGMENT: &str = r#"#ifdef CLIPPLANE
if (isClipped(fClipDistance)) {
    discard;
}
#endif
#ifdef CLIPPLANE2
if (isClipped(fClipDistance2)) {
    discard;
}
#endif
#ifdef CLIPPLANE3
if (isClipped(fClipDistance3)) {
    discard;
}
#endif
#ifdef CLIPPLANE4
if (isClipped(fClipDistance4)) {
    discard;
}
#endif
#ifdef CLIPPLANE5
if (isClipped(fClipDistance5)) {
    discard;
}
#endif
#ifdef CLIPPLANE6
if (isClipped(fClipDistance6)) {
    discard;
}
#endif
"#;
